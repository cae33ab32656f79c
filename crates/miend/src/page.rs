//! The single HTML page: enroll form, recognize form, result, enrolled list.
//!
//! Hand-assembled document, no template engine. Everything user-supplied is
//! escaped; notices arrive as fixed codes and unknown codes render nothing,
//! so the query string is not an injection vector.

/// One face on the result panel.
pub struct DetectedFace {
    /// Resolved display label (a name, or the unknown label).
    pub label: String,
    /// Best similarity, only for matched faces.
    pub similarity: Option<f32>,
}

/// Data for the result panel of a recognize response.
pub struct RecognitionView {
    /// `data:image/jpeg;base64,...` URI of the annotated upload.
    pub image_data_uri: String,
    pub faces: Vec<DetectedFace>,
}

const STYLE: &str = "body{font-family:sans-serif;max-width:760px;margin:2em auto;padding:0 1em}\
h1{color:#333}\
.section{background:#f5f5f5;padding:1em;margin:1em 0;border-radius:8px}\
.notice{background:#e8f5e9;border-left:4px solid #4caf50;padding:.6em 1em}\
img{max-width:100%}";

/// Render the page.
pub fn render(names: &[String], notice: Option<&str>, result: Option<&RecognitionView>) -> String {
    let notice_html = notice
        .and_then(notice_message)
        .map(|msg| format!("<p class=\"notice\">{msg}</p>"))
        .unwrap_or_default();

    let result_html = result.map(render_result).unwrap_or_default();

    let mut people = String::new();
    for name in names {
        people.push_str(&format!("<li>{}</li>", escape_html(name)));
    }
    let people_html = if people.is_empty() {
        "<p>No one enrolled yet.</p>".to_string()
    } else {
        format!("<ul>{people}</ul>")
    };

    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
<title>Mien face recognition</title>\
<style>{STYLE}</style></head><body>\
<h1>Mien</h1>\
{notice_html}\
<div class=\"section\"><h2>Enroll a face</h2>\
<form action=\"/enroll\" method=\"post\" enctype=\"multipart/form-data\">\
<input type=\"text\" name=\"name\" placeholder=\"Person name\" required> \
<input type=\"file\" name=\"image\" accept=\"image/*\" required> \
<button type=\"submit\">Enroll</button></form></div>\
<div class=\"section\"><h2>Recognize faces</h2>\
<form action=\"/recognize\" method=\"post\" enctype=\"multipart/form-data\">\
<input type=\"file\" name=\"image\" accept=\"image/*\" required> \
<button type=\"submit\">Recognize</button></form></div>\
{result_html}\
<div class=\"section\"><h2>Enrolled people</h2>{people_html}</div>\
</body></html>"
    )
}

fn render_result(view: &RecognitionView) -> String {
    let detected = if view.faces.is_empty() {
        "No faces detected.".to_string()
    } else {
        let labels: Vec<String> = view
            .faces
            .iter()
            .map(|f| match f.similarity {
                Some(sim) => format!("{} ({sim:.2})", escape_html(&f.label)),
                None => escape_html(&f.label),
            })
            .collect();
        format!("Detected: {}", labels.join(", "))
    };

    format!(
        "<div class=\"section\"><h2>Result</h2>\
<img src=\"{}\" alt=\"annotated upload\">\
<p>{detected}</p></div>",
        view.image_data_uri
    )
}

/// Map a notice code from the redirect query string to its banner text.
pub fn notice_message(code: &str) -> Option<&'static str> {
    match code {
        "enrolled" => Some("Face enrolled."),
        "replaced" => Some("Face re-enrolled; the previous embedding was replaced."),
        "missing_name" => Some("Enter a name to enroll."),
        "missing_image" => Some("Choose an image file first."),
        "bad_image" => Some("That file could not be decoded as an image."),
        "no_face" => Some("No face was detected in that image."),
        "error" => Some("Something went wrong; check the server log."),
        _ => None,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_both_forms() {
        let html = render(&[], None, None);
        assert!(html.contains("action=\"/enroll\""));
        assert!(html.contains("action=\"/recognize\""));
        assert!(html.contains("enctype=\"multipart/form-data\""));
    }

    #[test]
    fn test_render_empty_gallery() {
        let html = render(&[], None, None);
        assert!(html.contains("No one enrolled yet."));
        assert!(!html.contains("<ul>"));
    }

    #[test]
    fn test_render_lists_names_in_order() {
        let names = vec!["alice".to_string(), "bob".to_string()];
        let html = render(&names, None, None);
        let alice = html.find("<li>alice</li>").unwrap();
        let bob = html.find("<li>bob</li>").unwrap();
        assert!(alice < bob);
    }

    #[test]
    fn test_render_escapes_names() {
        let names = vec!["<script>alert(1)</script>".to_string()];
        let html = render(&names, None, None);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_known_notice() {
        let html = render(&[], Some("no_face"), None);
        assert!(html.contains("No face was detected"));
    }

    #[test]
    fn test_render_unknown_notice_is_dropped() {
        let html = render(&[], Some("<img onerror=x>"), None);
        assert!(!html.contains("class=\"notice\""));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn test_notice_codes_match_what_the_handlers_emit() {
        for code in [
            "enrolled",
            "replaced",
            "missing_name",
            "missing_image",
            "bad_image",
            "no_face",
            "error",
        ] {
            assert!(notice_message(code).is_some(), "unmapped code: {code}");
        }
        // Removal happens over the JSON API and never redirects to the page.
        assert!(notice_message("removed").is_none());
        assert!(notice_message("bogus").is_none());
    }

    #[test]
    fn test_render_result_with_faces() {
        let view = RecognitionView {
            image_data_uri: "data:image/jpeg;base64,QUJD".to_string(),
            faces: vec![
                DetectedFace { label: "alice".into(), similarity: Some(0.83) },
                DetectedFace { label: "Unknown".into(), similarity: None },
            ],
        };
        let html = render(&[], None, Some(&view));
        assert!(html.contains("data:image/jpeg;base64,QUJD"));
        assert!(html.contains("Detected: alice (0.83), Unknown"));
    }

    #[test]
    fn test_render_result_no_faces() {
        let view = RecognitionView {
            image_data_uri: "data:image/jpeg;base64,QUJD".to_string(),
            faces: vec![],
        };
        let html = render(&[], None, Some(&view));
        assert!(html.contains("No faces detected."));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&#39;");
    }
}
