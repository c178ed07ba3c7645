//! Conversation rendering.
//!
//! Message records become small [`ViewNode`] trees that mirror the chat page
//! markup. The renderer never mutates a node after it was appended.

use std::{fmt::Write as _, sync::Arc};

use chrono::{Local, Timelike};
use shared::{
    domain::DisplayName,
    protocol::{MessageBody, MessageRecord},
};

use crate::identity::SessionContext;

pub const AI_QUESTION_LABEL: &str = "向川小农AI提问";
pub const AI_ANSWER_LABEL: &str = "川小农回复";
pub const MOVIE_PLAYER_TITLE: &str = "电影播放";

pub trait Clock: Send + Sync {
    /// Local wall-clock time as zero-padded 24-hour `HH:MM`.
    fn now_hhmm(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_hhmm(&self) -> String {
        format_hhmm(&Local::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    pub hour: u32,
    pub minute: u32,
}

impl FixedClock {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }
}

impl Clock for FixedClock {
    fn now_hhmm(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

pub fn format_hhmm(time: &impl Timelike) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub tag: &'static str,
    pub classes: Vec<&'static str>,
    pub attrs: Vec<(&'static str, String)>,
    pub text: Option<String>,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            classes: Vec::new(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn div(class: &'static str) -> Self {
        Self::new("div").with_class(class)
    }

    pub fn with_class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: ViewNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| *c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Depth-first search including `self`.
    pub fn find(&self, class: &str) -> Option<&ViewNode> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(class))
    }

    pub fn find_tag(&self, tag: &str) -> Option<&ViewNode> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_tag(tag))
    }

    pub fn text_of(&self, class: &str) -> Option<&str> {
        self.find(class).and_then(|node| node.text.as_deref())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", self.classes.join(" "));
        }
        for (name, value) in &self.attrs {
            if value.is_empty() {
                let _ = write!(out, " {name}");
            } else {
                let _ = write!(out, " {name}=\"{}\"", escape_html(value));
            }
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_html(text));
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }

    /// Single-line plain-text rendition for terminals.
    pub fn to_text(&self) -> String {
        let mut segments = Vec::new();
        self.collect_text(&mut segments);
        segments.join(" | ")
    }

    fn collect_text(&self, segments: &mut Vec<String>) {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            segments.push(text.to_string());
        }
        if let Some(src) = self.attr("src") {
            segments.push(format!("[{src}]"));
        }
        for child in &self.children {
            child.collect_text(segments);
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Append-only log of rendered entries, always scrolled to the newest one.
#[derive(Debug, Default, Clone)]
pub struct ConversationView {
    entries: Vec<ViewNode>,
    scroll_anchor: Option<usize>,
}

impl ConversationView {
    pub fn append(&mut self, node: ViewNode) {
        self.entries.push(node);
        self.scroll_anchor = Some(self.entries.len() - 1);
    }

    pub fn entries(&self) -> &[ViewNode] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ViewNode> {
        self.entries.last()
    }

    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }

    pub fn is_scrolled_to_latest(&self) -> bool {
        self.scroll_anchor == self.entries.len().checked_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Other,
}

impl Ownership {
    pub fn class(self) -> &'static str {
        match self {
            Self::Own => "user",
            Self::Other => "other",
        }
    }
}

pub struct MessageRenderer {
    identity: DisplayName,
    clock: Arc<dyn Clock>,
}

impl MessageRenderer {
    pub fn new(context: &SessionContext, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity: context.identity().clone(),
            clock,
        }
    }

    pub fn ownership(&self, record: &MessageRecord) -> Ownership {
        if self.identity == *record.username.as_str() {
            Ownership::Own
        } else {
            Ownership::Other
        }
    }

    pub fn build(&self, record: &MessageRecord) -> ViewNode {
        let header = ViewNode::div("message-header").with_text(record.username.clone());

        let mut content = ViewNode::div("message-content").with_text(record.message.clone());
        match &record.body {
            MessageBody::Normal => {}
            MessageBody::Movie { movie_url } => {
                let player = ViewNode::new("iframe")
                    .with_attr("src", movie_url.clone())
                    .with_attr("width", "100%")
                    .with_attr("height", "100%")
                    .with_attr("allowfullscreen", "")
                    .with_attr("title", MOVIE_PLAYER_TITLE);
                content = content.with_child(
                    ViewNode::div("movie-card")
                        .with_child(ViewNode::div("movie-player").with_child(player)),
                );
            }
            MessageBody::AiChat {
                ai_message,
                ai_reply,
            } => {
                content = content
                    .with_child(
                        ViewNode::div("ai-chat")
                            .with_text(format!("{AI_QUESTION_LABEL}: {ai_message}")),
                    )
                    .with_child(
                        ViewNode::div("ai-reply")
                            .with_text(format!("{AI_ANSWER_LABEL}: {ai_reply}")),
                    );
            }
        }

        let timestamp = record
            .timestamp
            .clone()
            .unwrap_or_else(|| self.clock.now_hhmm());

        ViewNode::div("message")
            .with_class(self.ownership(record).class())
            .with_child(header)
            .with_child(content)
            .with_child(ViewNode::div("message-time").with_text(timestamp))
    }

    pub fn render(&self, view: &mut ConversationView, record: &MessageRecord) {
        view.append(self.build(record));
    }

    pub fn add_system_message(&self, view: &mut ConversationView, text: impl Into<String>) {
        view.append(system_notice(text));
    }
}

pub fn system_notice(text: impl Into<String>) -> ViewNode {
    ViewNode::div("message")
        .with_class("system")
        .with_child(ViewNode::div("message-content").with_text(text))
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
