use chrono::NaiveDate;

use crate::workflows::positive_surprise::domain::title_case;

/// Joins display names for the completion email: `A.`, `A and B.`,
/// `A, B, and C.`
pub fn join_ship_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => format!("{only}."),
        [first, second] => format!("{first} and {second}."),
        [rest @ .., last] => format!("{}, and {last}.", rest.join(", ")),
    }
}

pub fn link_summary_subject(ship_name: &str, sail_date: NaiveDate) -> String {
    format!(
        "Positive Surprise {} {}",
        title_case(ship_name),
        sail_date.format("(%m-%d-%Y)")
    )
}

/// One line per department link for a voyage.
pub fn link_lines(ship_name: &str, sail_date: NaiveDate, links: &[(String, String)]) -> String {
    let mut html = String::new();
    for (label, link) in links {
        html.push_str(&format!(
            "<p>{} \u{2794} <a href=\"{}\">{} {}</a></p>\n",
            escape_html(label),
            escape_html(link),
            escape_html(ship_name),
            sail_date.format("%m-%d-%Y")
        ));
    }
    html
}

/// Body sent to ship staff with the voyage's links.
pub fn link_summary_body(link_lines: &str, dashboard_url: &str) -> String {
    format!(
        r#"<html>
<head></head>
<body>
    <p>Hi,</p>
    <p>Attached, you will find links to Positive Surprise for the current sailing. Please be advised that access is limited to your department's link.</p>
    {link_lines}
    <p>Positive Surprise Guest List &#10132; <a href="{dashboard}">DASHBOARD</a></p>
    <p><strong>Update:</strong> Our Power BI dashboard consolidates all relevant department data in real time. Print files and mail merges stay on SharePoint. Access the dashboard through the link above.</p>
    <p><em>To access the provided links, please ensure that you are logged into SharePoint online.</em></p>
    <p>If you have any questions or comments, please inform us.
    <br>We appreciate your help!
    <br>Targeted Marketing Team</p>
    <p>Please note this is an automated message</p>
</body>
</html>
"#,
        dashboard = escape_html(dashboard_url),
    )
}

pub fn completion_subject(file_stamp: &str) -> String {
    format!("Positive Surprise Automation Pushed Data {file_stamp}")
}

pub fn completion_body(ship_names: &[String]) -> String {
    let titled: Vec<String> = ship_names.iter().map(|name| title_case(name)).collect();
    message_body(&format!(
        "The Positive Surprise Automation executed successfully for the following ships: {}",
        escape_html(&join_ship_names(&titled))
    ))
}

pub fn delivery_subject(ship_code: &str) -> String {
    format!("{ship_code} Positive Surprise File QA Server")
}

pub fn delivery_success_body() -> String {
    message_body("This is to inform you the file has been copied successfully!")
}

pub fn delivery_failure_body(detail: &str) -> String {
    message_body(&format!(
        "This is to inform you there has been an error copying the file! Error: {}",
        escape_html(detail)
    ))
}

/// Short operational message with greeting and automated-message footer.
pub fn message_body(message: &str) -> String {
    format!(
        r#"<html>
<head></head>
<body>
    <p>Hi,</p>
    <p>{message}</p>
    <p>Please note this is an automated message</p>
</body>
</html>
"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn ship_names_join_with_serial_comma() {
        assert_eq!(join_ship_names(&names(&["ShipA"])), "ShipA.");
        assert_eq!(join_ship_names(&names(&["ShipA", "ShipB"])), "ShipA and ShipB.");
        assert_eq!(
            join_ship_names(&names(&["ShipA", "ShipB", "ShipC"])),
            "ShipA, ShipB, and ShipC."
        );
        assert_eq!(
            join_ship_names(&names(&["A", "B", "C", "D"])),
            "A, B, C, and D."
        );
        assert_eq!(join_ship_names(&[]), "");
    }

    #[test]
    fn completion_body_title_cases_ships() {
        let body = completion_body(&names(&["EURODAM", "NIEUW AMSTERDAM"]));
        assert!(body.contains("following ships: Eurodam and Nieuw Amsterdam."));
    }

    #[test]
    fn link_lines_render_one_paragraph_per_link() {
        let sail_date = NaiveDate::from_ymd_opt(2026, 10, 24).expect("valid date");
        let lines = link_lines(
            "ZUIDERDAM",
            sail_date,
            &[
                ("Spa Print File".to_string(), "https://sp/spa.pdf?web=1".to_string()),
                ("Cabin Print File".to_string(), "https://sp/cabin.pdf?web=1".to_string()),
            ],
        );
        assert_eq!(lines.lines().count(), 2);
        assert!(lines.ends_with("ZUIDERDAM 10-24-2026</a></p>\n"));
        assert!(lines.contains(
            "<p>Spa Print File \u{2794} <a href=\"https://sp/spa.pdf?web=1\">ZUIDERDAM 10-24-2026</a></p>"
        ));
        assert_eq!(
            link_summary_subject("ZUIDERDAM", sail_date),
            "Positive Surprise Zuiderdam (10-24-2026)"
        );
    }

    #[test]
    fn failure_body_includes_transfer_detail() {
        let body = delivery_failure_body("connection refused <port 22>");
        assert!(body.contains("error copying the file! Error: connection refused &lt;port 22&gt;"));
        assert_eq!(delivery_subject("NA"), "NA Positive Surprise File QA Server");
    }
}
