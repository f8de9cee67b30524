//! Operator-facing alert text.
//!
//! Every channel renders from the same [`AlertMessage`], so the WhatsApp text,
//! the email subject and the email HTML always agree. Alerts and recoveries
//! share the builder and differ only in framing.

use std::fmt::Write as _;

use crate::reading::Parameter;
use crate::scoring::AnomalyResult;
use crate::severity::Severity;

/// How a message is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Severity went up.
    Alert,
    /// Severity went down but is still elevated.
    Downgrade,
    /// Back to normal.
    Recovery,
}

impl Framing {
    pub fn for_transition(previous: Severity, new: Severity) -> Self {
        if new == Severity::Normal {
            Framing::Recovery
        } else if new > previous {
            Framing::Alert
        } else {
            Framing::Downgrade
        }
    }

    fn marker(self, new: Severity) -> &'static str {
        match (self, new) {
            (Framing::Recovery, _) => "✅ RECOVERY",
            (Framing::Downgrade, _) => "⬇️ ALERT",
            (Framing::Alert, Severity::Critical) => "🚨 ALERT",
            (Framing::Alert, _) => "⚠️ ALERT",
        }
    }

    fn header_colour(self, new: Severity) -> &'static str {
        match (self, new) {
            (Framing::Recovery, _) => "#16a34a",
            (_, Severity::Critical) => "#dc2626",
            _ => "#d97706",
        }
    }

    fn recommendation(self, new: Severity) -> &'static str {
        match (self, new) {
            (Framing::Recovery, _) => {
                "Readings are back within normal limits. No action required; keep monitoring."
            }
            (_, Severity::Critical) => {
                "Inspect the site immediately and consider stopping discharge until water quality is restored."
            }
            _ => "Schedule an inspection and check treatment dosing at the site.",
        }
    }
}

/// Rendered content for every notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub framing: Framing,
    /// Plain text, used for WhatsApp and stored as the alert message.
    pub text: String,
    pub subject: String,
    pub html: String,
}

/// Build the message for a `previous -> new` transition of `sensor_id`.
///
/// `anomalies` are the contributing per-parameter results; normal results are
/// ignored.
pub fn build(
    sensor_id: &str,
    previous: Severity,
    new: Severity,
    anomalies: &[AnomalyResult],
) -> AlertMessage {
    let framing = Framing::for_transition(previous, new);
    let contributing: Vec<&AnomalyResult> = anomalies.iter().filter(|a| a.is_anomaly()).collect();

    AlertMessage {
        framing,
        text: build_text(framing, sensor_id, previous, new, &contributing),
        subject: build_subject(new, sensor_id),
        html: build_html(framing, sensor_id, previous, new, &contributing),
    }
}

fn upper(s: Severity) -> String {
    s.as_str().to_ascii_uppercase()
}

fn format_value(parameter: Parameter, value: f64) -> String {
    format!("{value:.2}{}", parameter.unit())
}

fn build_text(
    framing: Framing,
    sensor_id: &str,
    previous: Severity,
    new: Severity,
    anomalies: &[&AnomalyResult],
) -> String {
    let mut out = format!(
        "{}: {sensor_id}\nState: {} → {}\n",
        framing.marker(new),
        upper(previous),
        upper(new)
    );
    if !anomalies.is_empty() {
        out.push_str("\nParameters:\n");
        for a in anomalies {
            let _ = writeln!(
                out,
                "  • {}: {} ({})",
                a.parameter.label(),
                format_value(a.parameter, a.value),
                a.severity
            );
        }
    }
    out.truncate(out.trim_end().len());
    out
}

fn build_subject(new: Severity, sensor_id: &str) -> String {
    format!("[AquaMine] {} Alert - {sensor_id}", upper(new))
}

fn build_html(
    framing: Framing,
    sensor_id: &str,
    previous: Severity,
    new: Severity,
    anomalies: &[&AnomalyResult],
) -> String {
    let sensor = escape_html(sensor_id);
    let mut rows = String::new();
    for a in anomalies {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td></tr>",
            a.parameter.label(),
            escape_html(&format_value(a.parameter, a.value)),
            a.severity,
            a.score
        );
    }
    let table = if rows.is_empty() {
        String::new()
    } else {
        format!(
            "<table cellpadding=\"6\" style=\"border-collapse:collapse\">\
             <tr><th align=\"left\">Parameter</th><th align=\"left\">Value</th>\
             <th align=\"left\">Severity</th><th align=\"left\">Score</th></tr>{rows}</table>"
        )
    };

    format!(
        "<div style=\"font-family:sans-serif\">\
         <div style=\"background:{colour};color:#ffffff;padding:12px\">\
         <h2 style=\"margin:0\">{marker}: {sensor}</h2></div>\
         <p>State: <strong>{prev}</strong> → <strong>{next}</strong></p>\
         {table}\
         <p>{recommendation}</p></div>",
        colour = framing.header_colour(new),
        marker = framing.marker(new),
        prev = upper(previous),
        next = upper(new),
        recommendation = framing.recommendation(new),
    )
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
