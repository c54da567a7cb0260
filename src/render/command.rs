//! Typed re-entry commands
//!
//! Clickable bits of a tooltip (population names, parent breadcrumbs, tag
//! values) open a popup for another supporting record. They are rendered as
//! elements carrying `data-ml-*` attributes; the page's delegated listener
//! reads them back into a `TipCommand` and hands it to the composer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::render::format::esc_attr;

pub const ATTR_CXID: &str = "data-ml-cxid";
pub const ATTR_OBJID: &str = "data-ml-objid";
pub const ATTR_OBJTYPE: &str = "data-ml-objtype";

/// URL templates with this prefix describe a command instead of a link
pub const COMMAND_URL_PREFIX: &str = "MLdoEvent";

static COMMAND_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*=\s*(?:'([^']*)'|"([^"]*)")"#).expect("command argument pattern")
});

/// "Open the popup for record `objid` of category `objtype`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipCommand {
    /// Host widget the element belongs to
    pub cxid: String,
    pub objid: String,
    /// Category name; popups default to populations when absent
    pub objtype: Option<String>,
}

impl TipCommand {
    pub fn new(cxid: &str, objid: &str, objtype: Option<&str>) -> Self {
        Self {
            cxid: cxid.to_string(),
            objid: objid.to_string(),
            objtype: objtype.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }

    /// Rebuild a command from an element's attributes
    pub fn from_attrs<F>(get: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let objid = get(ATTR_OBJID).filter(|s| !s.is_empty())?;
        Some(Self {
            cxid: get(ATTR_CXID).unwrap_or_default(),
            objid,
            objtype: get(ATTR_OBJTYPE).filter(|s| !s.is_empty()),
        })
    }

    /// Parse an `MLdoEvent objid='X' objtype='Cat'` URL template.
    /// `None` when the template is an ordinary URL or names no object.
    pub fn from_url_template(cxid: &str, url: &str) -> Option<Self> {
        let rest = url.strip_prefix(COMMAND_URL_PREFIX)?;
        let mut objid = None;
        let mut objtype = None;
        for caps in COMMAND_ARG_RE.captures_iter(rest) {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            match &caps[1] {
                "objid" => objid = Some(value.to_string()),
                "objtype" => objtype = Some(value.to_string()),
                _ => {}
            }
        }
        let objid = objid.filter(|s| !s.is_empty())?;
        Some(Self::new(cxid, &objid, objtype.as_deref()))
    }

    /// HTML attributes carrying this command
    pub fn attrs(&self) -> String {
        let mut out = format!(
            "{}='{}' {}='{}'",
            ATTR_CXID,
            esc_attr(&self.cxid),
            ATTR_OBJID,
            esc_attr(&self.objid)
        );
        if let Some(t) = &self.objtype {
            out.push_str(&format!(" {}='{}'", ATTR_OBJTYPE, esc_attr(t)));
        }
        out
    }

    /// Clickable span showing `label`
    pub fn span(&self, label: &str) -> String {
        format!("<span class='faux moreinfo' {}>{}</span>", self.attrs(), label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_attrs_round_trip_through_element() {
        let cmd = TipCommand::new("cx1", "pop'7", Some("Pop"));
        let attrs = cmd.attrs();
        assert!(attrs.contains("data-ml-objid='pop&apos;7'"));

        let mut element: HashMap<&str, String> = HashMap::new();
        element.insert(ATTR_CXID, "cx1".into());
        element.insert(ATTR_OBJID, "pop'7".into());
        element.insert(ATTR_OBJTYPE, "Pop".into());
        let back = TipCommand::from_attrs(|name| element.get(name).cloned()).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_missing_objid_is_not_a_command() {
        assert!(TipCommand::from_attrs(|_| None).is_none());
    }

    #[test]
    fn test_url_template_command() {
        let cmd = TipCommand::from_url_template("cx", "MLdoEvent objid='C12' objtype='Cat'").unwrap();
        assert_eq!(cmd.objid, "C12");
        assert_eq!(cmd.objtype.as_deref(), Some("Cat"));
        assert!(TipCommand::from_url_template("cx", "http://example.org/?q=1").is_none());
    }

    #[test]
    fn test_span_markup() {
        let span = TipCommand::new("cx", "P1", None).span("Parent One");
        assert_eq!(
            span,
            "<span class='faux moreinfo' data-ml-cxid='cx' data-ml-objid='P1'>Parent One</span>"
        );
    }
}
