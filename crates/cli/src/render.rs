//! Plain-text rendering of feed entries, files and knowledge graphs for the terminal.

use lib::feed::{LogEntry, LogStore};
use lib::graph::{CircularLayout, GraphLayout, KnowledgeGraph};
use lib::session::GateState;
use lib::upload::UploadedFile;

/// Prints feed entries as they appear. Starts over when the feed is cleared.
#[derive(Default)]
pub struct FeedPrinter {
    printed: usize,
    epoch: u64,
}

impl FeedPrinter {
    pub async fn flush(&mut self, feed: &LogStore) {
        let epoch = feed.epoch();
        if epoch != self.epoch {
            self.epoch = epoch;
            self.printed = 0;
            println!("---");
        }
        let entries = feed.snapshot().await;
        for entry in entries.iter().skip(self.printed) {
            println!("{}", entry_text(entry));
        }
        self.printed = entries.len();
    }
}

pub fn entry_text(entry: &LogEntry) -> String {
    let who = entry
        .sender
        .clone()
        .unwrap_or_else(|| entry.role.as_str().to_string());
    let mut out = format!("[{}] {}: {}", entry.timestamp, who, entry.text);
    if let Some(a) = &entry.attachment {
        if let Some(details) = &a.details {
            out.push_str(&format!("\n    details: {}", details));
        }
        if !a.sources.is_empty() {
            out.push_str(&format!("\n    sources: {}", a.sources.join(", ")));
        }
        if let Some(chart) = &a.chart {
            out.push_str(&format!("\n    chart: {}", chart));
        }
        for step in &a.next_steps {
            out.push_str(&format!("\n    next: {}", step));
        }
    }
    out
}

pub fn file_line(file: &UploadedFile) -> String {
    let by = file
        .uploaded_by
        .as_deref()
        .map(|u| format!(" by {}", u))
        .unwrap_or_default();
    let busy = if file.status.is_terminal() { "" } else { " ..." };
    format!("{:<10} {}{}{}", format!("{:?}", file.status), file.name, by, busy)
}

pub fn gate_line(state: &GateState) -> String {
    match state {
        GateState::NoSession => "no workspace yet".to_string(),
        GateState::Creating => "creating workspace...".to_string(),
        GateState::Joining => "joining workspace...".to_string(),
        GateState::Active(s) => format!(
            "workspace \"{}\" ({}), members: {}, invite: {}",
            s.display_name,
            s.id,
            s.members.join(", "),
            if s.invite_link.is_empty() { &s.invite_token } else { &s.invite_link }
        ),
    }
}

pub fn print_graph(graph: &KnowledgeGraph) {
    if graph.is_empty() {
        println!("(empty knowledge graph)");
        return;
    }
    println!("concepts:");
    for d in graph.concept_degrees() {
        println!("  {} ({} links)", d.name, d.count);
    }
    println!("relationships:");
    for r in &graph.relationships {
        let name = |id: &str| {
            graph
                .concept(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        println!("  {} -[{}]-> {}", name(&r.source), r.kind, name(&r.target));
    }
    let dangling = graph.dangling_relationships().len();
    if dangling > 0 {
        println!("  ({} relationships point at unknown concepts)", dangling);
    }
    println!("layout:");
    for p in CircularLayout::default().layout(graph) {
        println!("  {} at ({:.0}, {:.0})", p.concept_id, p.x, p.y);
    }
}
