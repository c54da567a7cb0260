//! Standard miners: polymorphisms, alignments, features, unknown tracks
//!
//! Also installs the accession linkers (RefSeq, Ensembl, CDD, LOC, PubMed)
//! that turn identifiers in table cells into links.

use std::collections::BTreeSet;

use crate::de;
use crate::error::TipError;
use crate::miners::{EventKind, MinerOutput, MinerRegistry};
use crate::model::items::{allele_freq, AlignmentItem, Link, RnaImpact, VariantItem};
use crate::model::support::Category;
use crate::render::command::TipCommand;
use crate::render::format::{esc_attr, float_text, frac_to_gray, padded_percent, pretty_location, unique};
use crate::render::linker::TextLinker;
use crate::render::table::TableCell;
use crate::tooltip::context::TipContext;

const LINKERS: &[(&str, &str)] = &[
    (r"[NX][MR]_[0-9]+(\.[0-9]+)?", "mapLocReporter.pl?mode=rna&rna=__ID__"),
    (r"ENS[A-Z]*(T|P)[0-9]+(\.[0-9]+)?", "mapLocReporter.pl?mode=rna&rna=__ID__"),
    (r"CDD:\d+", "http://www.ncbi.nlm.nih.gov/Structure/cdd/cddsrv.cgi?uid=__NUM__"),
    (
        r"LOC[0-9]{1,}",
        "http://www.ncbi.nlm.nih.gov/sites/entrez?db=gene&cmd=Retrieve&dopt=full_report&list_uids=__ID__",
    ),
    (r"PMID:\d+", "http://www.ncbi.nlm.nih.gov/pubmed/?term=__NUM__"),
];

const VARVU_URL: &str = "http://www.ncbi.nlm.nih.gov/sites/varvu?gene=";
const LOCUS_SNP_URL: &str = "http://www.ncbi.nlm.nih.gov/projects//SNP/snp_ref.cgi?locusId=";

const SNP_CLASS_TAG: &str = "SNP Class Tag";
const POP_COLUMNS: usize = 3;
const LONG_ALLELE: usize = 20;
const ALLELE_CHUNK: usize = 5;
const FEATURE_NAME_MAX: usize = 25;

pub fn register(registry: &mut MinerRegistry, linker: &mut TextLinker) -> Result<(), TipError> {
    let ev = EventKind::MouseOver;
    registry.register_header(ev, "polymorphismBrief", |_| vec!["Impact".into(), "Location".into()]);
    registry.register(ev, "polymorphismBrief", polymorphism_brief);
    registry.register(ev, "polymorphism", polymorphism);
    registry.register(ev, "alignment", alignment);
    registry.register_header(ev, "featureBrief", |_| vec!["Size".into(), "Name".into()]);
    registry.register(ev, "featureBrief", feature_brief);
    registry.register(ev, "feature", generic);
    registry.register(ev, "unknown", generic);

    for (pattern, url) in LINKERS {
        linker.register_linker(pattern, url)?;
    }
    Ok(())
}

fn generic(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    MinerOutput::html(ctx.generic_pop_text(d))
}

fn feature_brief(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let base = ctx.item(d)?.base();
    Some(MinerOutput::Row(vec![
        TableCell::new(base.len.clone().unwrap_or_default()),
        TableCell::new(ctx.basic_id(d)),
    ]))
}

// =============================================================================
// Polymorphisms
// =============================================================================

fn polymorphism_brief(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let v = ctx.item(d)?.as_variant()?;
    let impact = match &v.imp_name {
        Some(name) => TableCell::new(name.as_str())
            .class(format!("Imp{}", v.imp_token.as_deref().unwrap_or(""))),
        None => TableCell::new("?"),
    };
    let ids = ctx.var_name(v).join("<br />");
    Some(MinerOutput::Row(vec![impact, TableCell::new(ids)]))
}

fn polymorphism(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let v = ctx.item(d)?.as_variant()?;
    let mut text = ctx.var_name(v);

    if !v.base.cats.is_empty() {
        let cats: Vec<String> = v
            .base
            .cats
            .iter()
            .map(|cat| match ctx.record(Category::Cat, cat).and_then(|c| c.color_tag) {
                Some(color) => format!("<span style='color:{}'>{}</span>", color, cat),
                None => cat.clone(),
            })
            .collect();
        text.push(format!("<i>{}</i>", cats.join(", ")));
    }
    match v.maf.as_deref() {
        Some("-1") => text.push("<i>Alleles specified without frequency</i>".to_string()),
        Some(maf) => text.push(format!("MAF={}%", maf)),
        None => {}
    }
    if let Some(name) = &v.imp_name {
        text.push(match &v.imp_token {
            Some(tok) => format!("<span class='Imp{}'>{}</span>", tok, name),
            None => name.clone(),
        });
    }
    let links = ctx.hyperlinks(d, Vec::new());
    if !links.is_empty() {
        text.push(links);
    }
    if !v.revcom.is_empty() {
        text.push("<i>Reported alleles are from -1 genomic strand</i>".to_string());
    }

    let feats = feature_table(ctx, v);
    if !feats.is_empty() {
        text.push(feats);
    }

    let mut alleles: BTreeSet<&str> = BTreeSet::new();
    for imp in v.impact.rnas.values() {
        alleles.extend(imp.var.keys().map(String::as_str));
    }
    for by_allele in v.base.freqs.values() {
        alleles.extend(by_allele.keys().map(String::as_str));
    }
    let alleles: Vec<String> = alleles.into_iter().map(str::to_string).collect();
    let reference = v.impact.rnas.values().next().and_then(|imp| imp.reference.as_deref());
    let allele_head = allele_header(&alleles, reference, v);

    let mut errors: Vec<String> = Vec::new();
    let mut tab = String::new();
    if !v.impact.rnas.is_empty() {
        tab.push_str(&format!(
            "<tr>{}<th>Impact</th><th>Prot</th><th>Nuc</th><th>RNA</th></tr>",
            allele_head
        ));
        let rows = v
            .impact
            .rnas
            .iter()
            .map(|(rid, imp)| {
                errors.extend(imp.errors.iter().cloned());
                impact_row(ctx, rid, imp, &alleles)
            })
            .collect();
        tab.push_str(&ctx.slim_table(rows, 1));
    }

    let pops: Vec<&String> = v.base.freqs.keys().collect();
    if ctx.config().wants_gravity_plot(alleles.len(), pops.len()) {
        tab.push_str(&format!(
            "<tr><td colspan='{}'>{}</td></tr>",
            alleles.len() + POP_COLUMNS + 1,
            ctx.gravity_plot(&v.base.freqs, &alleles, &v.revcom)
        ));
    }
    if !pops.is_empty() {
        tab.push_str(&format!(
            "<tr>{}<th>Class</th><th colspan='{}'>Population</th></tr>",
            allele_head, POP_COLUMNS
        ));
        let class_tags = snp_class_tags(ctx, v);
        let rows = pops
            .iter()
            .enumerate()
            .map(|(p, pid)| population_row(ctx, v, pid, p, &alleles, &class_tags))
            .collect();
        tab.push_str(&ctx.slim_table(rows, 0));
    }
    errors.extend(v.impact.errors.iter().cloned());

    if !tab.is_empty() {
        text.push(format!(
            "<table style='font-size:1.0em' class='tab'><tbody>{}</tbody></table>",
            tab
        ));
    }
    let tags = ctx.selected_tag_table(&v.base);
    if !tags.is_empty() {
        text.push(tags);
    }
    if !errors.is_empty() {
        text.push(format!(
            "<div class='err'><b>Errors reported!</b><ul><li>{}</li></ul></div>",
            unique(&errors).join("</li><li>")
        ));
    }
    MinerOutput::html(text.join(ctx.sep()))
}

/// Color swatch and name for each overlapping feature
fn feature_table(ctx: &TipContext, v: &VariantItem) -> String {
    let mut feats: Vec<_> = v
        .features
        .iter()
        .filter_map(|fid| ctx.record(Category::Feat, fid))
        .collect();
    if feats.is_empty() {
        return String::new();
    }
    feats.sort_by(|a, b| a.text.cmp(&b.text));

    let mut html = String::from("<table style='font-size:0.8em'><tbody>");
    for fd in &feats {
        html.push_str(&format!(
            "<tr><td style='background-color:{}'>&nbsp;</td>",
            fd.color.as_deref().unwrap_or("")
        ));
        let mut name = fd.name.clone().or_else(|| fd.text.clone()).unwrap_or_default();
        let mut title = Vec::new();
        if fd.name.is_some() {
            title.push(format!("[{}]", fd.text.as_deref().unwrap_or("")));
        }
        if let Some(com) = &fd.com {
            title.push(com.clone());
        }
        if name.chars().count() > FEATURE_NAME_MAX {
            title.push(name.clone());
            name = name.chars().take(FEATURE_NAME_MAX).collect::<String>() + "&hellip;";
        }
        html.push_str("<td");
        if !title.is_empty() {
            html.push_str(&format!(" title='{}'", esc_attr(&title.join(" "))));
        }
        html.push_str(&format!(">{}</td></tr>", name));
    }
    html.push_str("</tbody></table>");
    html
}

/// `<th>` per allele; the reference allele of the first RNA is green
fn allele_header(alleles: &[String], reference: Option<&str>, v: &VariantItem) -> String {
    alleles
        .iter()
        .map(|allele| {
            let style = if reference == Some(allele.as_str()) {
                " style='color:green'"
            } else {
                ""
            };
            let mut shown = if v.revcom.is_empty() {
                allele.clone()
            } else {
                v.revcom.get(allele).cloned().unwrap_or_else(|| format!("?{}?", allele))
            };
            let len = allele.chars().count();
            if len > LONG_ALLELE {
                shown = format!("{}bp", len);
            } else if shown.chars().count() > ALLELE_CHUNK {
                let chars: Vec<char> = shown.chars().collect();
                shown = chars
                    .chunks(ALLELE_CHUNK)
                    .map(|c| c.iter().collect::<String>())
                    .collect::<Vec<_>>()
                    .join(" ");
            }
            format!("<th{}>{}</th>", style, shown)
        })
        .collect()
}

/// One RNA's impact row, led by a hidden sort column (alignment quality, impact)
fn impact_row(ctx: &TipContext, rid: &str, imp: &RnaImpact, alleles: &[String]) -> Vec<TableCell> {
    let rna = ctx.record_or_default(Category::Rna, rid);
    let align = imp
        .align
        .as_deref()
        .map(|aid| ctx.record_or_default(Category::Align, aid))
        .unwrap_or_default();

    let mut rna_text = rna.name.unwrap_or_default();
    let howbad = match align.howbad {
        None => {
            rna_text = format!(
                "<span class='howbad' title='It is not known how well this position is aligned to the genome'>&Dagger;??%</span> {}",
                rna_text
            );
            100.0
        }
        Some(hb) => {
            if hb != 0.0 {
                rna_text = format!(
                    "<span class='howbad' title='Not the best genomic location for this gene'>&Dagger;{}%</span> {}",
                    float_text(hb),
                    rna_text
                );
            }
            hb
        }
    };
    if let Some(note) = &imp.note {
        rna_text.push_str(&format!("<br /><span class='note'>{}</span>", note));
    }
    let token = imp.imp.as_deref().unwrap_or("");
    let rank = if howbad == 0.0 { 100.0 } else { howbad };
    let sorter = format!("{}\t{}", float_text(rank / 1000.0), token);

    let mut row: Vec<TableCell> = alleles
        .iter()
        .map(|allele| TableCell::new(codon_markup(imp, allele)).class("allele"))
        .collect();
    row.push(TableCell::new(token).class(format!("Imp{}", token)));
    row.push(
        TableCell::new(imp.prot_nom.clone().or_else(|| imp.prot_pos.clone()).unwrap_or_default())
            .class("seq"),
    );
    row.push(
        TableCell::new(imp.nuc_nom.clone().or_else(|| imp.nuc_pos.clone()).unwrap_or_default())
            .class("seq"),
    );
    row.push(TableCell::new(rna_text));

    if let Some(note) = &imp.imp_note {
        // The note replaces the allele cells
        row[0] = TableCell::new(note.as_str()).class("note");
        for cell in row.iter_mut().take(alleles.len()).skip(1) {
            *cell = TableCell::span();
        }
    }
    row.insert(0, TableCell::new(sorter));
    row
}

/// Codon in triplets with the variant bases highlighted, protein below
fn codon_markup(imp: &RnaImpact, allele: &str) -> String {
    let Some(change) = imp.var.get(allele) else {
        return String::new();
    };
    let mut out = String::new();
    if let Some(codon) = &change.codon {
        let blen = if allele == "-" { 0 } else { allele.chars().count() as i64 };
        let (mut start, mut end, mut insert) = (None, None, None);
        if let Some(cp) = imp.cdpos {
            let s = cp as i64 - 1;
            if blen == 0 {
                insert = Some(s);
            } else {
                start = Some(s);
                end = Some(s + blen - 1);
            }
        }
        for (c, ch) in codon.chars().enumerate() {
            let c = c as i64;
            if c > 0 && c % 3 == 0 {
                out.push(' ');
            }
            if start == Some(c) {
                out.push_str("<span class='var'>");
            }
            if insert == Some(c) {
                out.push_str("<span class='del'>-</span>");
            }
            out.push(ch);
            if end == Some(c) {
                out.push_str("</span>");
            }
        }
    }
    if let Some(protein) = change.protein.as_deref().filter(|p| !p.is_empty()) {
        out.push_str(&format!("<div class='prt'>{}</div>", protein));
    }
    out
}

/// Tag names whose values classify populations for this variant
fn snp_class_tags(ctx: &TipContext, v: &VariantItem) -> Vec<String> {
    let mut tags = Vec::new();
    for cat in &v.base.cats {
        let Some(record) = ctx.record(Category::Cat, cat) else {
            continue;
        };
        for tag in record.tags.get(SNP_CLASS_TAG).into_iter().flatten() {
            if !tag.is_empty() && !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }
    tags
}

fn population_row(
    ctx: &TipContext,
    v: &VariantItem,
    pid: &str,
    p: usize,
    alleles: &[String],
    class_tags: &[String],
) -> Vec<TableCell> {
    let pop = ctx.record_or_default(Category::Pop, pid);
    let name = pop.name.clone().unwrap_or_else(|| pid.to_string()).replace('_', " ");

    let mut row: Vec<TableCell> = alleles
        .iter()
        .enumerate()
        .map(|(b, allele)| {
            let Some(entry) = allele_freq(&v.base.freqs, pid, allele) else {
                return TableCell::new("");
            };
            let (text, class, style, title) = match entry.freq {
                None => {
                    let mut title = "No frequency data available".to_string();
                    let text = match entry.count {
                        Some(n) => {
                            title.push_str(&format!(", total count of {}", n));
                            format!("?&nbsp;/&nbsp;{}", n)
                        }
                        None => "&#10003;".to_string(),
                    };
                    (text, format!("nofreq Bogus{}_{}", b, p), String::new(), title)
                }
                Some(fv) => {
                    let mut num = 1.0;
                    let mut title = String::new();
                    if let Some(n) = entry.count {
                        num = (0.5 + fv * n as f64).floor();
                        title = format!("{} out of {}", float_text(num), n);
                    }
                    if num != 0.0 {
                        (padded_percent(fv), "freq".to_string(), frac_to_gray(fv), title)
                    } else {
                        (
                            "&Oslash;".to_string(),
                            "countzero".to_string(),
                            String::new(),
                            "Explicitly zero".to_string(),
                        )
                    }
                }
            };
            let attrs = if title.is_empty() {
                String::new()
            } else {
                format!("title='{}'", esc_attr(&title))
            };
            TableCell::new(text).class(class).style(style).attrs(attrs)
        })
        .collect();

    let mut classes: Vec<String> = Vec::new();
    for tag in class_tags {
        for val in pop.tags.get(tag).into_iter().flatten() {
            if !val.is_empty() && !classes.contains(val) {
                classes.push(val.clone());
            }
        }
    }
    let mut classes: Vec<String> = classes
        .into_iter()
        .map(|c| match ctx.store().color(&c) {
            Some(style) => format!("<span style='{}'>{}</span>", style, c),
            None => c,
        })
        .collect();
    classes.sort();
    row.push(TableCell::new(classes.join(",")));

    let mut class = "moreinfo".to_string();
    if let Some(ok_pids) = &v.ok_pids {
        class.push_str(match ok_pids.get(pid).copied().unwrap_or(0.0) {
            ok if ok == 0.0 => " filtFail",
            ok if ok < 0.0 => " filtOk",
            _ => " filtPass",
        });
    }
    let style = pop.color_tag.as_ref().map(|c| format!("color: {}", c)).unwrap_or_default();
    let command = TipCommand::new(ctx.cxid(), pid, Some(Category::Pop.as_str()));
    row.push(TableCell::new(name).class(class).style(style).attrs(command.attrs()));
    row.push(TableCell::span());
    row.push(TableCell::span());
    row
}

// =============================================================================
// Alignments
// =============================================================================

fn alignment(ctx: &TipContext, d: usize) -> Option<MinerOutput> {
    let Some(a) = ctx.item(d)?.as_alignment() else {
        return generic(ctx, d);
    };
    MinerOutput::html(alignment_text(ctx, d, a))
}

fn first_tag<'t>(a: &'t AlignmentItem, tag: &str) -> Option<&'t str> {
    a.base.tags.get(tag).and_then(|v| v.first()).map(String::as_str)
}

fn alignment_text(ctx: &TipContext, d: usize, a: &AlignmentItem) -> String {
    let mut text = Vec::new();
    let id = ctx.basic_id(d);
    if !id.is_empty() {
        text.push(id);
    }

    let mut links = Vec::new();
    if let Some(llid) = &a.llid {
        links.push(Link::Labeled { url: format!("{}{}", VARVU_URL, llid), label: Some("VarViewer".into()) });
        links.push(Link::Labeled { url: format!("{}{}", LOCUS_SNP_URL, llid), label: Some("dbSNP".into()) });
    }

    if let Some(desc) = first_tag(a, "Description") {
        text.push(format!("<i>{}</i>", ctx.swap_link(desc)));
    }
    if let Some(gene) = &a.gene {
        text.push(format!("<b>Gene:</b> {}", ctx.command_span(gene, Some("Gene"), gene)));
    }

    let mut locus = Vec::new();
    if let Some(taxa) = first_tag(a, "Taxa") {
        locus.push(taxa.to_string());
    }
    if let Some(symbol) = first_tag(a, "Symbol").filter(|s| !s.is_empty()) {
        locus.push(format!("<b>{}</b>", symbol));
    }
    if let Some(loc) = first_tag(a, "LocusID") {
        locus.push(ctx.swap_link(loc));
    }
    if !locus.is_empty() {
        text.push(locus.join(" "));
    }

    let mut protein = Vec::new();
    if !a.aacoord.is_empty() {
        let coord = |i: usize| {
            a.aacoord.get(i).and_then(de::value_text).map(|s| pretty_location(&s)).unwrap_or_default()
        };
        protein.push(format!("{}&ndash;{}aa", coord(0), coord(1)));
    }
    if let Some(phase) = &a.phase {
        protein.push(format!("Phase {}", phase));
    }
    if !protein.is_empty() {
        text.push(protein.join(", "));
    }

    if let Some(score) = &a.score {
        let hb = a.howbad.unwrap_or(0.0);
        let mut color = String::from(if hb < 1.0 {
            "#060"
        } else if hb < 3.0 {
            "#f90"
        } else {
            "#f00"
        });
        let verdict = if hb != 0.0 {
            color.push_str(";font-weight:bold");
            format!("{}% worse than best", float_text(hb))
        } else {
            "Best genome match".to_string()
        };
        text.push(format!(
            "Score {}% = <span style='color:{}'>{}</span>",
            score, color, verdict
        ));
    }
    if let Some(kind) = &a.kind {
        let style = ctx.store().color(kind).unwrap_or_default();
        text.push(format!("Type: <span style='{}'>{}</span>", style, kind));
    }
    let links = ctx.hyperlinks(d, links);
    if !links.is_empty() {
        text.push(links);
    }

    let hit_type = a.kind.as_deref().unwrap_or("HSP");
    for (chr, hits) in &a.coords {
        text.push(format!("<b>Chromosome {}:</b>", chr));
        let rows = hits
            .iter()
            .map(|hit| {
                let field = |i: usize| hit.get(i).and_then(de::value_text).unwrap_or_default();
                let (start, end) = (field(1), field(2));
                let length = match (
                    hit.get(1).and_then(de::value_f64),
                    hit.get(2).and_then(de::value_f64),
                ) {
                    (Some(s), Some(e)) => pretty_location(&float_text(e - s + 1.0)),
                    _ => String::new(),
                };
                vec![
                    TableCell::new(field(0)),
                    TableCell::new(format!("{} - {}", pretty_location(&start), pretty_location(&end))),
                    TableCell::new(length),
                    TableCell::new(field(3)),
                    TableCell::new(field(4)),
                ]
            })
            .collect();
        text.push(format!(
            "<table style='font-size:1.0em' class='tab'><tbody><tr><th>Build</th><th>Coordinates</th><th>Length</th><th>{}</th><th>Strand</th></tr>{}</tbody></table>",
            hit_type,
            ctx.slim_table(rows, 0)
        ));
    }
    if let Some(source) = &a.source {
        text.push(format!("<span style='font-size:0.8em'>Source: {}</span>", source));
    }
    text.join(ctx.sep())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::items::CodonChange;
    use std::collections::BTreeMap;

    fn impact(cdpos: f64, var: &[(&str, &str, &str)]) -> RnaImpact {
        let mut map = BTreeMap::new();
        for (allele, codon, prot) in var {
            map.insert(
                allele.to_string(),
                CodonChange { codon: Some(codon.to_string()), protein: Some(prot.to_string()) },
            );
        }
        RnaImpact { var: map, cdpos: Some(cdpos), ..Default::default() }
    }

    #[test]
    fn test_codon_markup_substitution() {
        let imp = impact(2.0, &[("T", "GTA", "Val")]);
        assert_eq!(
            codon_markup(&imp, "T"),
            "G<span class='var'>T</span>A<div class='prt'>Val</div>"
        );
    }

    #[test]
    fn test_codon_markup_triplets_and_deletion() {
        let imp = impact(4.0, &[("-", "GCAGCA", "")]);
        assert_eq!(codon_markup(&imp, "-"), "GCA <span class='del'>-</span>GCA");
        assert_eq!(codon_markup(&imp, "A"), "");
    }

    #[test]
    fn test_codon_markup_empty_protein_has_no_div() {
        let imp = impact(2.0, &[("T", "GTA", "")]);
        let html = codon_markup(&imp, "T");
        assert_eq!(html, "G<span class='var'>T</span>A");
        assert!(!html.contains("prt"));
    }

    #[test]
    fn test_allele_header_chunks_and_reference() {
        let v = VariantItem::default();
        let alleles = vec!["A".to_string(), "ACGTACG".to_string(), "A".repeat(21)];
        let html = allele_header(&alleles, Some("A"), &v);
        assert_eq!(
            html,
            "<th style='color:green'>A</th><th>ACGTA CG</th><th>21bp</th>"
        );
    }

    #[test]
    fn test_allele_header_reverse_strand() {
        let mut v = VariantItem::default();
        v.revcom.insert("A".into(), "T".into());
        let html = allele_header(&["A".to_string(), "G".to_string()], None, &v);
        assert_eq!(html, "<th>T</th><th>?G?</th>");
    }
}
