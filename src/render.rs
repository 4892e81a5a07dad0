use crate::flash::Flash;
use crate::storage::StoredFile;
use std::fmt::Write;

const STYLE: &str = "\
body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
.flash{padding:.75rem 1rem;border-radius:4px;margin-bottom:1rem}\
.flash.success{background:#e6f4ea;color:#1e4620}\
.flash.error{background:#fce8e6;color:#611a15}\
table{width:100%;border-collapse:collapse}\
td{padding:.4rem;border-bottom:1px solid #ddd}\
td.size{text-align:right;white-space:nowrap}\
form.inline{display:inline}";

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Renders the listing page with at most one status message.
pub fn index_page(files: &[StoredFile], flash: Option<&Flash>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>File Drop</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>File Drop</h1>\n"
    );

    if let Some(flash) = flash {
        let _ = writeln!(
            html,
            "<div class=\"flash {}\">{}</div>",
            flash.level.as_str(),
            html_escape::encode_text(&flash.message)
        );
    }

    html.push_str(
        "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\">\n\
         <button type=\"submit\">Upload</button>\n</form>\n",
    );

    if files.is_empty() {
        html.push_str("<p class=\"empty\">No files uploaded yet.</p>\n");
    } else {
        html.push_str("<table>\n");
        for file in files {
            let name = html_escape::encode_text(&file.name);
            let encoded = urlencoding::encode(&file.name);
            let href = html_escape::encode_double_quoted_attribute(&encoded);
            let _ = writeln!(
                html,
                "<tr><td><a href=\"/download/{href}\">{name}</a></td>\
                 <td class=\"size\">{}</td>\
                 <td><form class=\"inline\" action=\"/delete/{href}\" method=\"post\">\
                 <button type=\"submit\">Delete</button></form></td></tr>",
                human_size(file.size)
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(16 * 1024 * 1024), "16.0 MiB");
    }

    #[test]
    fn empty_listing() {
        let page = index_page(&[], None);
        assert!(page.contains("No files uploaded yet."));
        assert!(!page.contains("<table>"));
        assert!(!page.contains("class=\"flash"));
    }

    #[test]
    fn listing_with_flash() {
        let files = vec![StoredFile {
            name: "notes.txt".into(),
            size: 5,
        }];
        let page = index_page(&files, Some(&Flash::success("File \"notes.txt\" uploaded")));

        assert!(page.contains("<div class=\"flash success\">File \"notes.txt\" uploaded</div>"));
        assert!(page.contains("<a href=\"/download/notes.txt\">notes.txt</a>"));
        assert!(page.contains("action=\"/delete/notes.txt\" method=\"post\""));
        assert!(page.contains("5 B"));
    }

    #[test]
    fn hostile_names_are_escaped() {
        let files = vec![StoredFile {
            name: "<img src=x onerror=alert(1)>.txt".into(),
            size: 1,
        }];
        let page = index_page(&files, None);
        assert!(!page.contains("<img"));
        assert!(page.contains("&lt;img src=x onerror=alert(1)&gt;.txt"));
        assert!(page.contains("href=\"/download/%3Cimg%20src%3Dx%20onerror%3Dalert%281%29%3E.txt\""));
    }

    #[test]
    fn flash_markup_is_escaped() {
        let page = index_page(&[], Some(&Flash::error("<b>bad</b> & worse")));
        assert!(page.contains("<div class=\"flash error\">&lt;b&gt;bad&lt;/b&gt; &amp; worse</div>"));
    }

    #[test]
    fn link_targets_are_percent_encoded() {
        let files = vec![StoredFile {
            name: "my file#1 ü.txt".into(),
            size: 1,
        }];
        let page = index_page(&files, None);
        assert!(page.contains("href=\"/download/my%20file%231%20%C3%BC.txt\""));
        assert!(page.contains("action=\"/delete/my%20file%231%20%C3%BC.txt\""));
        assert!(page.contains(">my file#1 ü.txt</a>"));
    }
}
