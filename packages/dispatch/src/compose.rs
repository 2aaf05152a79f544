//! Alert message text: email subjects and bodies, SMS bodies.

use std::fmt::Write as _;

use truck_alert_classify::keywords::{ACCIDENT_KEYWORDS, contains_any};
use truck_alert_dispatch_models::MessageBody;
use truck_alert_incident_models::Incident;

/// Words that put a batch in the spill subject line.
const SUBJECT_SPILL_KEYWORDS: &[&str] = &["spill", "hazmat"];

/// Road names listed in a multi-incident SMS.
const SMS_LISTED_ROADS: usize = 3;

const SMS_LOCATION_CHARS: usize = 40;
const SMS_DESCRIPTION_CHARS: usize = 50;
const SMS_ROAD_CHARS: usize = 20;
const HAZMAT_SMS_LOCATION_CHARS: usize = 35;

const ELLIPSIS: &str = "...";

fn take_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Cuts `message` to fit in `budget` characters, ending in `...` when cut.
///
/// A budget too small for the ellipsis gets a plain cut.
#[must_use]
pub fn fit_to_budget(message: &str, budget: usize) -> String {
    if message.chars().count() <= budget {
        return message.to_string();
    }
    if budget < ELLIPSIS.len() {
        return take_chars(message, budget);
    }
    let keep = budget.saturating_sub(ELLIPSIS.len());
    format!("{}{ELLIPSIS}", take_chars(message, keep))
}

// ── Email ───────────────────────────────────────────────────────────

/// Subject line for a general alert email, chosen from batch content.
#[must_use]
pub fn email_subject(incidents: &[Incident], region: &str) -> String {
    let has_spill = incidents
        .iter()
        .any(|i| contains_any(&i.description.to_lowercase(), SUBJECT_SPILL_KEYWORDS));
    let has_accident = incidents
        .iter()
        .any(|i| contains_any(&i.description.to_lowercase(), ACCIDENT_KEYWORDS));

    match (has_spill, has_accident) {
        (true, true) => format!("CRITICAL ALERT: Spill & Accident in {region}"),
        (true, false) => format!("SPILL ALERT: Hazardous Material Incident in {region}"),
        (false, true) => format!("ACCIDENT ALERT: Heavy Truck Incident in {region}"),
        (false, false) => format!("Heavy Truck Incident Alert - {region}"),
    }
}

/// Subject line for a hazmat alert email.
#[must_use]
pub fn hazmat_email_subject(incidents: &[Incident], region: &str) -> String {
    let plural = if incidents.len() == 1 { "" } else { "s" };
    format!(
        "HAZMAT ALERT: {} Spill/Hazmat Incident{plural} in {region}",
        incidents.len()
    )
}

/// Plain-text and HTML bodies listing every incident in the batch.
#[must_use]
pub fn email_body(incidents: &[Incident], region: &str) -> MessageBody {
    MessageBody {
        text: email_text(incidents, region),
        html: email_html(incidents, region),
        attachment: None,
    }
}

fn email_text(incidents: &[Incident], region: &str) -> String {
    let mut text = format!(
        "{} TRAFFIC ALERT\n\n{} new heavy truck/hazmat incident(s) detected:\n",
        region.to_uppercase(),
        incidents.len()
    );

    for (n, incident) in incidents.iter().enumerate() {
        let _ = write!(
            text,
            "\nIncident #{}:\nLocation: {}\nDescription: {}\nTime: {}\nPriority: {}\n{}\n",
            n + 1,
            incident.location,
            incident.description,
            incident.incident_time,
            incident.severity.priority_label(),
            "-".repeat(60),
        );
    }

    text
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn email_html(incidents: &[Incident], region: &str) -> String {
    let mut rows = String::new();
    for incident in incidents {
        let label = incident.severity.priority_label();
        let _ = write!(
            rows,
            "<tr class=\"priority-{}\"><td>{}</td><td>{}</td><td>{}</td><td>{label}</td></tr>",
            label.to_lowercase(),
            escape_html(&incident.location),
            escape_html(&incident.description),
            escape_html(&incident.incident_time),
        );
    }

    format!(
        "<html><body>\
         <h2>{region} Traffic Alert</h2>\
         <p>{count} new heavy truck/hazmat incident(s) detected.</p>\
         <table>\
         <tr><th>Location</th><th>Description</th><th>Time</th><th>Priority</th></tr>\
         {rows}\
         </table>\
         </body></html>",
        region = escape_html(region),
        count = incidents.len(),
    )
}

// ── SMS ─────────────────────────────────────────────────────────────

/// Main road of a location: everything before the `@`.
fn main_road(location: &str) -> &str {
    location.split('@').next().unwrap_or(location).trim()
}

/// SMS body for a general alert, within `budget` characters.
#[must_use]
pub fn sms_message(incidents: &[Incident], region: &str, budget: usize) -> String {
    let prefix = format!("{} ALERT", region.to_uppercase());

    let message = match incidents {
        [] => format!("{prefix}: no new incidents"),
        [incident] => format!(
            "{prefix}: {} - {}",
            take_chars(&incident.location, SMS_LOCATION_CHARS),
            take_chars(&incident.description, SMS_DESCRIPTION_CHARS),
        ),
        _ => {
            let mut roads = incidents
                .iter()
                .take(SMS_LISTED_ROADS)
                .map(|i| take_chars(main_road(&i.location), SMS_ROAD_CHARS))
                .collect::<Vec<_>>()
                .join(", ");
            if incidents.len() > SMS_LISTED_ROADS {
                let _ = write!(roads, " +{} more", incidents.len() - SMS_LISTED_ROADS);
            }
            format!("{prefix}: {} incidents - {roads}", incidents.len())
        }
    };

    fit_to_budget(&message, budget)
}

/// SMS body for a hazmat alert, within `budget` characters.
#[must_use]
pub fn hazmat_sms_message(incidents: &[Incident], region: &str, budget: usize) -> String {
    let message = match incidents {
        [incident] => format!(
            "HAZMAT ALERT: {} - Spill/hazmat incident reported",
            take_chars(&incident.location, HAZMAT_SMS_LOCATION_CHARS)
        ),
        _ => format!(
            "HAZMAT ALERT: {} spill/hazmat incidents in {region} area",
            incidents.len()
        ),
    };

    fit_to_budget(&message, budget)
}
