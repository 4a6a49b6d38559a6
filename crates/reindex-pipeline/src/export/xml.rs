//! XML rendering for the bulk export format.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <database>
//! <name>..</name> <description>..</description> <release>..</release>
//! <release_date>DD-Mon-YYYY</release_date>
//! <entries>
//! <entry id=".."> .. </entry>   one per document
//! </entries>
//! <entry_count>N</entry_count>
//! </database>
//! ```

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::NaiveDate;

use reindex_types::{CrossReference, Document, ExportFieldMapping};

/// Fixed header block of an export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHeader {
    pub name: String,
    pub description: String,
    pub release: String,
    pub release_date: NaiveDate,
}

impl ExportHeader {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        release: impl Into<String>,
        release_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            release: release.into(),
            release_date,
        }
    }

    /// Header dated today.
    pub fn today(
        name: impl Into<String>,
        description: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            description,
            release,
            chrono::Local::now().date_naive(),
        )
    }
}

/// Whether XML 1.0 allows `c` anywhere in a document. Rust `char`s are
/// never surrogates, so only control characters and two noncharacters fail.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Escape text for use in element content or a double-quoted attribute.
///
/// Characters XML cannot carry at all (most C0 controls, U+FFFE, U+FFFF)
/// are dropped.
pub fn escape(raw: &str) -> Cow<'_, str> {
    let clean = raw
        .chars()
        .all(|c| is_xml_char(c) && !matches!(c, '&' | '<' | '>' | '"' | '\''));
    if clean {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 16);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other if is_xml_char(other) => out.push(other),
            _ => {}
        }
    }
    Cow::Owned(out)
}

pub fn render_header(header: &ExportHeader) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <database>\n\
         <name>{}</name>\n\
         <description>{}</description>\n\
         <release>{}</release>\n\
         <release_date>{}</release_date>\n\
         <entries>\n",
        escape(&header.name),
        escape(&header.description),
        escape(&header.release),
        header.release_date.format("%d-%b-%Y"),
    )
}

/// Render one document as an `entry` element.
///
/// The name falls back to the document id. Cross-reference values that are
/// not `dbname:dbkey` pairs are skipped.
pub fn render_entry(document: &Document, fields: &ExportFieldMapping) -> String {
    let mut out = String::with_capacity(256);
    let name = document
        .get(&fields.name_field)
        .map(|v| v.to_string())
        .unwrap_or_else(|| document.id.clone());

    // Writing into a String cannot fail.
    let _ = writeln!(out, "<entry id=\"{}\">", escape(&document.id));
    let _ = writeln!(out, "<name>{}</name>", escape(&name));
    if let Some(description) = document.get(&fields.description_field) {
        let _ = writeln!(
            out,
            "<description>{}</description>",
            escape(&description.to_string())
        );
    }

    out.push_str("<cross_references>\n");
    let xrefs = document
        .get(&fields.cross_reference_field)
        .map(|v| v.to_strings())
        .unwrap_or_default();
    for xref in xrefs.iter().filter_map(|raw| CrossReference::parse(raw)) {
        let _ = writeln!(
            out,
            "<ref dbname=\"{}\" dbkey=\"{}\"/>",
            escape(&xref.db_name),
            escape(&xref.db_key)
        );
    }
    out.push_str("</cross_references>\n");

    out.push_str("<additional_fields>\n");
    for field in &fields.additional_fields {
        let Some(value) = document.get(field) else {
            continue;
        };
        for item in value.to_strings() {
            let _ = writeln!(
                out,
                "<field name=\"{}\">{}</field>",
                escape(field),
                escape(&item)
            );
        }
    }
    out.push_str("</additional_fields>\n");
    out.push_str("</entry>\n");
    out
}

pub fn render_footer(entry_count: u64) -> String {
    format!(
        "</entries>\n<entry_count>{}</entry_count>\n</database>\n",
        entry_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape() {
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
        assert_eq!(
            escape(r#"a<b & "c" 'd'>"#),
            "a&lt;b &amp; &quot;c&quot; &apos;d&apos;&gt;"
        );
    }

    #[test]
    fn test_escape_drops_characters_xml_cannot_carry() {
        assert_eq!(escape("bad\u{1}name"), "badname");
        assert_eq!(escape("a\u{0}\u{8}\u{B}\u{C}\u{1F}b\u{FFFE}\u{FFFF}"), "ab");
        assert_eq!(escape("<\u{7}>"), "&lt;&gt;");
        assert!(matches!(escape("tab\there\nline\r"), Cow::Borrowed(_)));
        assert!(matches!(escape("caf\u{E9} \u{1F600}"), Cow::Borrowed(_)));

        let fields = ExportFieldMapping::default();
        let document = Document::new("1", "Pathway")
            .with_field("name", "bad\u{1}name")
            .with_field("description", "line\u{0}feed");
        let entry = render_entry(&document, &fields);
        assert!(entry.contains("<name>badname</name>"));
        assert!(entry.contains("<description>linefeed</description>"));
        assert!(!entry.chars().any(|c| !is_xml_char(c)));
    }

    #[test]
    fn test_render_header() {
        let header = ExportHeader::new(
            "Reactome",
            "Pathways & reactions",
            "87",
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );
        let xml = render_header(&header);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<database>\n"));
        assert!(xml.contains("<description>Pathways &amp; reactions</description>"));
        assert!(xml.contains("<release_date>05-Mar-2024</release_date>"));
        assert!(xml.ends_with("<entries>\n"));
    }

    #[test]
    fn test_render_entry() {
        let fields = ExportFieldMapping {
            additional_fields: vec!["species".into(), "missing".into()],
            ..Default::default()
        };
        let document = Document::new("R-HSA-1", "Pathway")
            .with_field("name", "Apoptosis <intrinsic>")
            .with_field(
                "cross_references",
                vec!["GO:0006915".to_string(), "garbage".to_string()],
            )
            .with_field(
                "species",
                vec!["Homo sapiens".to_string(), "Mus musculus".to_string()],
            );

        let expected = "<entry id=\"R-HSA-1\">\n\
            <name>Apoptosis &lt;intrinsic&gt;</name>\n\
            <cross_references>\n\
            <ref dbname=\"GO\" dbkey=\"0006915\"/>\n\
            </cross_references>\n\
            <additional_fields>\n\
            <field name=\"species\">Homo sapiens</field>\n\
            <field name=\"species\">Mus musculus</field>\n\
            </additional_fields>\n\
            </entry>\n";
        assert_eq!(render_entry(&document, &fields), expected);
    }

    #[test]
    fn test_render_entry_optional_description_and_name_fallback() {
        let fields = ExportFieldMapping::default();
        let with_description = Document::new("1", "Complex").with_field("description", "A complex");
        assert!(render_entry(&with_description, &fields)
            .contains("<description>A complex</description>"));

        let bare = render_entry(&Document::new("2", "Complex"), &fields);
        assert!(bare.contains("<name>2</name>"));
        assert!(!bare.contains("<description>"));
    }

    #[test]
    fn test_render_footer() {
        assert_eq!(
            render_footer(3),
            "</entries>\n<entry_count>3</entry_count>\n</database>\n"
        );
    }
}
