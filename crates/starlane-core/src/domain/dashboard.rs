//! Read-only dashboard projection.
//!
//! [`DashboardView::project`] turns a validated [`ConfigModel`] into link
//! cards grouped under section headers plus a sidebar index keyed by group
//! position (`group-0`, `group-1`, …).  [`DashboardView::filter`] applies the
//! live search box: a case-insensitive substring match against item names,
//! hiding any section left with zero matches.
//!
//! The HTML produced by [`render_html`] escapes every user-supplied string.

use std::fmt::Write as _;

use super::config::{is_renderable_url, Background, ConfigModel, Theme};

/// Title shown when the configuration leaves `pageTitle` empty.
pub const DEFAULT_PAGE_TITLE: &str = "Starlane";

/// Message shown in place of sections when the configuration has no groups.
pub const EMPTY_STATE_MESSAGE: &str = "No services yet. Open the settings panel to add some.";

/// One clickable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCard {
    pub name: String,
    /// `None` when the item URL is not an absolute http/https URL; such cards
    /// are shown but not clickable.
    pub href: Option<String>,
    pub icon: Option<String>,
}

/// A group rendered as a titled section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSection {
    pub anchor_id: String,
    pub title: String,
    pub cards: Vec<LinkCard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub anchor_id: String,
    pub label: String,
}

/// Everything the dashboard needs to draw one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub title: String,
    pub theme: Theme,
    pub background: Background,
    pub sections: Vec<GroupSection>,
    pub sidebar: Vec<SidebarEntry>,
}

/// A section as it appears under the current filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleSection<'a> {
    pub section: &'a GroupSection,
    pub cards: Vec<&'a LinkCard>,
}

impl DashboardView {
    pub fn project(model: &ConfigModel) -> Self {
        let title = if model.page_title.trim().is_empty() {
            DEFAULT_PAGE_TITLE.to_string()
        } else {
            model.page_title.clone()
        };

        let sections: Vec<GroupSection> = model
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| GroupSection {
                anchor_id: anchor_id(index),
                title: group.name.clone(),
                cards: group
                    .items
                    .iter()
                    .map(|item| LinkCard {
                        name: item.name.clone(),
                        href: is_renderable_url(&item.url).then(|| item.url.clone()),
                        icon: (!item.icon.is_empty()).then(|| item.icon.clone()),
                    })
                    .collect(),
            })
            .collect();

        let sidebar = sections
            .iter()
            .map(|s| SidebarEntry {
                anchor_id: s.anchor_id.clone(),
                label: s.title.clone(),
            })
            .collect();

        Self {
            title,
            theme: model.theme,
            background: model.background.clone(),
            sections,
            sidebar,
        }
    }

    /// `true` when there are no groups to show; the empty-state message is
    /// displayed instead.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Applies the search box text.
    ///
    /// A blank query shows everything, including groups with no items.  Any
    /// other query keeps only cards whose name contains it (ignoring case and
    /// surrounding whitespace) and drops sections with no remaining cards.
    pub fn filter(&self, query: &str) -> Vec<VisibleSection<'_>> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return self
                .sections
                .iter()
                .map(|section| VisibleSection {
                    section,
                    cards: section.cards.iter().collect(),
                })
                .collect();
        }

        self.sections
            .iter()
            .filter_map(|section| {
                let cards: Vec<&LinkCard> = section
                    .cards
                    .iter()
                    .filter(|card| card.name.to_lowercase().contains(&term))
                    .collect();
                (!cards.is_empty()).then_some(VisibleSection { section, cards })
            })
            .collect()
    }
}

fn anchor_id(index: usize) -> String {
    format!("group-{index}")
}

/// What the read-only page shows after a load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardPage {
    /// Loaded successfully.  May still be empty; see [`DashboardView::is_empty`].
    Ready(DashboardView),
    /// Loading failed; the whole page is replaced by this message.
    Error { message: String },
}

impl DashboardPage {
    pub fn from_model(model: &ConfigModel) -> Self {
        DashboardPage::Ready(DashboardView::project(model))
    }

    pub fn error(message: impl Into<String>) -> Self {
        DashboardPage::Error {
            message: message.into(),
        }
    }
}

// ── Text and HTML output ──────────────────────────────────────────────────────

/// Renders a plain-text listing, one section per group.
pub fn render_text(page: &DashboardPage, query: &str) -> String {
    let mut out = String::new();
    match page {
        DashboardPage::Error { message } => {
            let _ = writeln!(out, "Failed to load configuration: {message}");
        }
        DashboardPage::Ready(view) => {
            let _ = writeln!(out, "{}", view.title);
            if view.is_empty() {
                let _ = writeln!(out, "\n{EMPTY_STATE_MESSAGE}");
                return out;
            }
            for visible in view.filter(query) {
                let _ = writeln!(out, "\n[{}]", visible.section.title);
                for card in visible.cards {
                    match &card.href {
                        Some(href) => {
                            let _ = writeln!(out, "  {}  {}", card.name, href);
                        }
                        None => {
                            let _ = writeln!(out, "  {}  (invalid link)", card.name);
                        }
                    }
                }
            }
        }
    }
    out
}

/// Renders the page body as an HTML fragment.
pub fn render_html(page: &DashboardPage, query: &str) -> String {
    let mut out = String::new();
    match page {
        DashboardPage::Error { message } => {
            let _ = write!(
                out,
                "<div class=\"load-error\"><h1>Failed to load configuration</h1><p>{}</p></div>",
                escape_html(message)
            );
        }
        DashboardPage::Ready(view) => {
            let _ = write!(
                out,
                "<h1 id=\"page-title\">{}</h1>",
                escape_html(&view.title)
            );
            if view.is_empty() {
                let _ = write!(out, "<p class=\"empty-state\">{}</p>", EMPTY_STATE_MESSAGE);
                return out;
            }
            let visible = view.filter(query);

            out.push_str("<nav><ul id=\"sidebar-group-list\">");
            for entry in &view.sidebar {
                let _ = write!(
                    out,
                    "<li><a href=\"#{0}\" data-target-id=\"{0}\">{1}</a></li>",
                    escape_html(&entry.anchor_id),
                    escape_html(&entry.label)
                );
            }
            out.push_str("</ul></nav><main>");

            for section in visible {
                let _ = write!(
                    out,
                    "<section class=\"group\" id=\"{}\"><h2 class=\"group-title\">{}</h2><div class=\"items-container\">",
                    escape_html(&section.section.anchor_id),
                    escape_html(&section.section.title)
                );
                for card in section.cards {
                    render_card(&mut out, card);
                }
                out.push_str("</div></section>");
            }
            out.push_str("</main>");
        }
    }
    out
}

fn render_card(out: &mut String, card: &LinkCard) {
    match &card.href {
        Some(href) => {
            let _ = write!(
                out,
                "<a class=\"link-card\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">",
                escape_html(href)
            );
        }
        None => out.push_str("<a class=\"link-card disabled\">"),
    }
    if let Some(icon) = &card.icon {
        let _ = write!(
            out,
            "<img class=\"link-icon\" src=\"{}\" loading=\"lazy\">",
            escape_html(icon)
        );
    }
    let _ = write!(
        out,
        "<span class=\"link-name\">{}</span></a>",
        escape_html(&card.name)
    );
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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
