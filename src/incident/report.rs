//! Rule-based report synthesis.
//!
//! `synthesize` is pure and deterministic: the same context always yields a
//! byte-identical report. Suggested actions come from a fixed, ordered rule
//! table; each rule contributes at most one action.

use crate::incident::model::{IncidentContext, IncidentReport};

pub const FALLBACK_ACTION: &str = "investigate further — insufficient data";

const FALLBACK_SERVICE: &str = "affected-service";
const NONE_FOUND: &str = "none found";
const SHORT_ID_LEN: usize = 7;

type Rule = fn(&IncidentContext) -> Option<String>;

/// Evaluated in order; every rule that fires appends one action.
const RULES: [Rule; 4] = [rollback_rule, database_rule, restart_rule, ticket_rule];

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn any_log_mentions(context: &IncidentContext, needles: &[&str]) -> bool {
    context.logs.iter().any(|log| {
        let message = log.message.to_lowercase();
        needles.iter().any(|needle| message.contains(needle))
    })
}

fn rollback_rule(context: &IncidentContext) -> Option<String> {
    context
        .commits
        .first()
        .map(|commit| format!("rollback recent deployment (commit {})", short_id(&commit.id)))
}

fn database_rule(context: &IncidentContext) -> Option<String> {
    any_log_mentions(context, &["database", "connection"])
        .then(|| "scale read-replicas for database service".to_string())
}

fn restart_rule(context: &IncidentContext) -> Option<String> {
    if !any_log_mentions(context, &["timeout", "refused"]) {
        return None;
    }
    let service = context
        .logs
        .first()
        .map(|log| log.service.as_str())
        .filter(|service| !service.is_empty())
        .unwrap_or(FALLBACK_SERVICE);
    Some(format!("restart \"{}\" pods", service))
}

fn ticket_rule(context: &IncidentContext) -> Option<String> {
    context
        .tickets
        .first()
        .map(|ticket| format!("review related ticket {}", ticket.key))
}

pub fn suggested_actions(context: &IncidentContext) -> Vec<String> {
    let actions: Vec<String> = RULES.iter().filter_map(|rule| rule(context)).collect();
    if actions.is_empty() {
        vec![FALLBACK_ACTION.to_string()]
    } else {
        actions
    }
}

pub fn root_cause(context: &IncidentContext) -> String {
    match (context.commits.first(), context.logs.is_empty()) {
        (Some(commit), false) => format!(
            "Recent commit {} '{}' by {} correlates with the start of the error spike.",
            short_id(&commit.id),
            commit.message,
            commit.author
        ),
        _ => "Undetermined: no correlated commit and error log data available.".to_string(),
    }
}

/// Bulleted section body, or the placeholder when there is nothing to list.
fn section<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return NONE_FOUND.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", render(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary(context: &IncidentContext) -> String {
    let logs = section(&context.logs, |l| format!("[{}] {} ({})", l.level, l.message, l.service));
    let commits = section(&context.commits, |c| {
        format!("`{}` {} (by {})", short_id(&c.id), c.message, c.author)
    });
    let tickets = section(&context.tickets, |t| format!("{}: {} ({})", t.key, t.summary, t.status));
    let chat = section(&context.messages, |m| format!("[{}] {}: {}", m.channel, m.user, m.text));

    format!(
        "**Incident Analysis Report**\n\n\
         **Errors Detected:** {}\n\
         **Recent Commits:** {}\n\
         **Related Tickets:** {}\n\
         **Chat Messages:** {}\n\n\
         ---\n\n\
         **Error Logs:**\n{}\n\n\
         **Recent Commits:**\n{}\n\n\
         **Related Tickets:**\n{}\n\n\
         **Recent Chat:**\n{}\n\n\
         ---\n\n\
         **Probable Root Cause:** {}",
        context.logs.len(),
        context.commits.len(),
        context.tickets.len(),
        context.messages.len(),
        logs,
        commits,
        tickets,
        chat,
        root_cause(context),
    )
}

pub fn synthesize(context: &IncidentContext) -> IncidentReport {
    IncidentReport {
        summary: summary(context),
        suggested_actions: suggested_actions(context),
    }
}
