use super::outline::Outline;

/// An existing marker found in a page, with the element's visible text (empty when the
/// element has no closing tag or no text).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkedText {
    pub key: String,
    pub text: String,
}

/// Lists every `marker_attr` key in document order, skipping `<head>`, scripts, styles and
/// comments.
pub fn collect_markers(src: &str, marker_attr: &str) -> anyhow::Result<Vec<MarkedText>> {
    let outline = Outline::parse(src)?;
    let mut out = Vec::new();
    for (idx, node) in outline.nodes().iter().enumerate() {
        let Some(key) = node.attr(marker_attr).map(str::trim) else {
            continue;
        };
        if key.is_empty() || node.excluded {
            continue;
        }
        out.push(MarkedText {
            key: key.to_string(),
            text: outline.visible_text(idx),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_listed_with_their_text() {
        let src = r#"<head><meta data-i18n="meta-skip"></head>
<h2 data-i18n="home-services">Services</h2>
<p><i class="bi"></i> <span data-i18n="home-office-hours">Office
   Hours</span></p>
<input data-i18n="home-search" placeholder="Search">"#;
        let got = collect_markers(src, "data-i18n").unwrap();
        assert_eq!(
            got,
            vec![
                MarkedText {
                    key: "home-services".into(),
                    text: "Services".into()
                },
                MarkedText {
                    key: "home-office-hours".into(),
                    text: "Office Hours".into()
                },
                MarkedText {
                    key: "home-search".into(),
                    text: String::new()
                },
            ]
        );
    }

    #[test]
    fn commented_out_markers_are_ignored() {
        let src = r#"<!-- <p data-i18n="old-key">Old</p> --><p data-i18n="new-key">New</p>"#;
        let keys: Vec<String> = collect_markers(src, "data-i18n")
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["new-key"]);
    }

    #[test]
    fn custom_attribute_name_is_honored() {
        let got =
            collect_markers(r#"<p data-t="a-b">x y</p><p data-i18n="c-d">z</p>"#, "data-t").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].key, "a-b");
    }
}
