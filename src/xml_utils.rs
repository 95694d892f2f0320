use roxmltree::{Document, Node, ParsingOptions};

/// Parse XML text into an immutable tree. Documents with a DTD are accepted, GML exports from
/// some desktop tools still carry one.
pub fn parse_xml(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    Document::parse_with_options(text, options)
}

/// Text of all text nodes below `node`, each trimmed, joined by single spaces. Whitespace-only
/// nodes are dropped.
pub fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|descendant| descendant.is_text())
        .filter_map(|descendant| descendant.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `node` is an element with the given local name, regardless of its namespace prefix.
pub fn has_local_name(node: &Node, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

#[cfg(test)]
mod tests {
    use super::{has_local_name, parse_xml, text_content};

    #[test]
    fn test_text_content_is_trimmed_and_joined() {
        let document = parse_xml("<a>\n  one <b>two</b> <![CDATA[three]]>\n</a>").unwrap();
        assert_eq!("one two three", text_content(document.root_element()));
    }

    #[test]
    fn test_text_content_separates_child_elements() {
        let document =
            parse_xml("<address>\n  <street>Main</street><city>Town</city>\n</address>").unwrap();
        assert_eq!("Main Town", text_content(document.root_element()));

        let document = parse_xml("<name>  </name>").unwrap();
        assert_eq!("", text_content(document.root_element()));
    }

    #[test]
    fn test_has_local_name_ignores_prefix() {
        let document =
            parse_xml(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#).unwrap();
        assert!(has_local_name(&document.root_element(), "schema"));
        assert!(!has_local_name(&document.root_element(), "xs:schema"));
    }

    #[test]
    fn test_parse_xml_rejects_unclosed_element() {
        assert!(parse_xml("<a><b></a>").is_err());
    }
}
