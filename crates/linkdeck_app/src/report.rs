//! Page session snapshot for display and export

use serde::Serialize;
use std::fmt;

use crate::controller::{CardState, EntranceTiming};
use crate::load_timing::LoadMetrics;
use crate::logger::ClickRecord;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardReport {
    pub index: usize,
    pub url: String,
    pub label: String,
    pub state: CardState,
    pub hovered: bool,
    /// Timing the entrance ran with, or the current timing if it has not run
    pub timing: EntranceTiming,
    pub opacity: Option<String>,
    pub transform: Option<String>,
    pub will_change: Option<String>,
}

/// Everything observable about a page after a session
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageReport {
    pub time_ms: u64,
    pub reduced_motion: bool,
    pub pending_registrations: usize,
    pub cards: Vec<CardReport>,
    pub clicks: Vec<ClickRecord>,
    pub load: LoadMetrics,
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

impl fmt::Display for PageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "t={}ms  motion={}  cards={}  waiting={}",
            self.time_ms,
            if self.reduced_motion { "reduced" } else { "full" },
            self.cards.len(),
            self.pending_registrations
        )?;
        for card in &self.cards {
            writeln!(
                f,
                "  #{:<2} {:<9} delay={:>4}ms dur={:>4}ms opacity={} will-change={}{}  {} <{}>",
                card.index,
                card.state,
                card.timing.delay_ms,
                card.timing.duration_ms,
                or_dash(&card.opacity),
                or_dash(&card.will_change),
                if card.hovered { " (hover)" } else { "" },
                card.label,
                card.url
            )?;
        }
        for click in &self.clicks {
            writeln!(f, "  click @{}ms  {} <{}>", click.time_ms, click.label, click.url)?;
        }
        let ms = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{}ms", v));
        write!(
            f,
            "  load: first-paint={} fcp={} dcl={} complete={}",
            ms(self.load.first_paint_ms),
            ms(self.load.first_contentful_paint_ms),
            ms(self.load.dom_content_loaded_ms),
            ms(self.load.load_complete_ms)
        )
    }
}
