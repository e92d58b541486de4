//! HTML rendering for alert emails.
//!
//! Bordered, striped table of scraped rows inside a small standard page
//! shell. Link cells render as hyperlinks; everything else is escaped.

use pricewatch_core::{Record, Value};

/// Escape text for HTML element content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Link(url) => format!(r#"<a href="{}" target="_blank">Link</a>"#, escape(url)),
        other => escape(&other.to_string()),
    }
}

/// Render records as an HTML table. Column order comes from the first row.
pub fn render_table(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::from("<p>No results.</p>");
    };

    let mut html = String::from("<table>\n  <tr>");
    for column in first.columns() {
        html.push_str(&format!("<th>{}</th>", escape(column)));
    }
    html.push_str("</tr>\n");

    for record in records {
        html.push_str("  <tr>");
        for (_, value) in record.iter() {
            html.push_str(&format!("<td>{}</td>", render_cell(value)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

/// Standard alert email shell: heading, message, table, optional booking link.
pub fn html_body(title: &str, message: &str, table_html: &str, booking_url: Option<&str>) -> String {
    let booking_link = booking_url
        .map(|url| format!(r#"<p><a href="{}">Click here to book</a></p>"#, escape(url)))
        .unwrap_or_default();

    format!(
        r#"<html>
  <head>
    <style>
      body {{ font-family: sans-serif; }}
      table {{ border-collapse: collapse; width: 100%; }}
      th, td {{ border: 1px solid #dddddd; text-align: left; padding: 8px; }}
      th {{ background-color: #f2f2f2; }}
      tr:nth-child(even) {{ background-color: #f9f9f9; }}
    </style>
  </head>
  <body>
    <h2>{}</h2>
    <p>{}</p>
    {}
    {}
  </body>
</html>
"#,
        escape(title),
        escape(message),
        table_html,
        booking_link
    )
}
