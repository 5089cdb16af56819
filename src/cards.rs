//! Scene title cards
//!
//! A [`CardDeck`] is rendered one card at a time into a fixed 1920x1080
//! page and captured as `scene-card-{num}.png`. The HTML is a pure function
//! of the deck, so the same deck always yields the same cards.

use action_flow::escape_html;
use cdp_adapter::{Cdp, PageId, Viewport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::{ReelError, ReelResult};

const CAPTURE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDeck {
    /// Highlighted first word of the footer
    pub brand: String,
    #[serde(default)]
    pub brand_tagline: Option<String>,
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default = "default_background")]
    pub background: String,
    pub cards: Vec<SceneCard>,
}

fn default_accent() -> String {
    "#2563eb".to_string()
}

fn default_background() -> String {
    "#0a0a0a".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCard {
    pub num: u32,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Raw HTML, usually an entity such as `&#x1F512;`
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

impl CardDeck {
    pub fn from_yaml_str(raw: &str) -> ReelResult<Self> {
        let deck: CardDeck = serde_yaml::from_str(raw)?;
        deck.validate()?;
        Ok(deck)
    }

    pub fn load(path: &Path) -> ReelResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    fn validate(&self) -> ReelResult<()> {
        if self.cards.is_empty() {
            return Err(ReelError::invalid("card deck has no cards"));
        }
        let mut seen = std::collections::HashSet::new();
        for card in &self.cards {
            if !seen.insert(card.num) {
                return Err(ReelError::invalid(format!(
                    "card number {} appears twice",
                    card.num
                )));
            }
        }
        for colour in [&self.accent, &self.background] {
            if !is_css_colour(colour) {
                return Err(ReelError::invalid(format!("'{colour}' is not a hex colour")));
            }
        }
        Ok(())
    }
}

fn is_css_colour(raw: &str) -> bool {
    raw.strip_prefix('#')
        .map(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// `#2563eb` -> `37,99,235`; short form is expanded
fn rgb_triplet(hex: &str) -> String {
    let digits = hex.trim_start_matches('#');
    let full: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    let channel = |range: std::ops::Range<usize>| {
        full.get(range)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0)
    };
    format!("{},{},{}", channel(0..2), channel(2..4), channel(4..6))
}

pub fn card_file_name(card: &SceneCard) -> String {
    format!("scene-card-{}.png", card.num)
}

pub fn render_card_html(deck: &CardDeck, card: &SceneCard) -> String {
    let accent = &deck.accent;
    let glow = rgb_triplet(accent);
    let bullets = card
        .bullets
        .iter()
        .map(|bullet| format!("<li>{}</li>", escape_html(bullet)))
        .collect::<Vec<_>>()
        .join("\n      ");
    let icon = card
        .icon
        .as_deref()
        .map(|icon| format!(r#"<span class="icon">{icon}</span>"#))
        .unwrap_or_default();
    let subtitle = card
        .subtitle
        .as_deref()
        .map(|subtitle| format!(r#"<div class="subtitle">{}</div>"#, escape_html(subtitle)))
        .unwrap_or_default();
    let tagline = deck
        .brand_tagline
        .as_deref()
        .map(|tagline| format!(" {}", escape_html(tagline)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{
  width: 1920px; height: 1080px; background: {background};
  display: flex; align-items: center; justify-content: center;
  font-family: 'Segoe UI', Arial, sans-serif; overflow: hidden; position: relative;
}}
body::before {{
  content: ''; position: absolute; top: 0; left: 0; right: 0; bottom: 0;
  background-image:
    linear-gradient(rgba(255,255,255,0.02) 1px, transparent 1px),
    linear-gradient(90deg, rgba(255,255,255,0.02) 1px, transparent 1px);
  background-size: 60px 60px;
}}
.glow {{
  position: absolute; width: 500px; height: 500px; border-radius: 50%;
  background: radial-gradient(circle, rgba({glow},0.12) 0%, transparent 70%);
  top: 50%; left: 50%; transform: translate(-50%, -50%);
}}
.content {{ text-align: center; position: relative; z-index: 1; max-width: 900px; }}
.scene-num {{ font-size: 15px; color: {accent}; letter-spacing: 6px; text-transform: uppercase; margin-bottom: 20px; }}
.icon {{ font-size: 48px; margin-bottom: 20px; display: block; }}
.title {{ font-size: 56px; font-weight: 700; color: #fff; letter-spacing: 1px; margin-bottom: 8px; }}
.subtitle {{ font-size: 22px; font-weight: 300; color: #888; letter-spacing: 3px; margin-bottom: 40px; }}
.divider {{ width: 100px; height: 2px; background: linear-gradient(90deg, transparent, {accent}, transparent); margin: 0 auto 40px; }}
.bullets {{ list-style: none; text-align: left; display: inline-block; }}
.bullets li {{ font-size: 20px; color: #bbb; line-height: 1.8; padding-left: 28px; position: relative; }}
.bullets li::before {{
  content: ''; position: absolute; left: 0; top: 13px;
  width: 8px; height: 8px; border-radius: 50%; background: {accent};
}}
.brand-footer {{ position: absolute; bottom: 40px; left: 0; right: 0; text-align: center; font-size: 13px; color: #333; letter-spacing: 4px; }}
.brand-footer span {{ color: {accent}; }}
</style>
</head>
<body>
  <div class="glow"></div>
  <div class="content">
    <div class="scene-num">Scene {num} of {total}</div>
    {icon}
    <div class="title">{title}</div>
    {subtitle}
    <div class="divider"></div>
    <ul class="bullets">
      {bullets}
    </ul>
  </div>
  <div class="brand-footer"><span>{brand}</span>{tagline}</div>
</body>
</html>"#,
        background = deck.background,
        num = card.num,
        total = deck.cards.len(),
        title = escape_html(&card.title),
        brand = escape_html(&deck.brand),
    )
}

/// Which cards made it to disk
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeckReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(u32, String)>,
}

impl DeckReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub async fn render_deck(
    cdp: &dyn Cdp,
    page: PageId,
    deck: &CardDeck,
    out_dir: &Path,
) -> ReelResult<DeckReport> {
    tokio::fs::create_dir_all(out_dir).await?;
    cdp.set_device_metrics(page, Viewport::full_hd()).await?;

    let mut report = DeckReport::default();
    for card in &deck.cards {
        let path = out_dir.join(card_file_name(card));
        match capture_card(cdp, page, deck, card, &path).await {
            Ok(()) => {
                info!(card = card.num, title = %card.title, path = %path.display(), "Card written");
                report.written.push(path);
            }
            Err(err) => {
                warn!(card = card.num, error = %err, "Card failed; continuing with the rest");
                report.failed.push((card.num, err.to_string()));
            }
        }
    }
    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Card deck rendered"
    );
    Ok(report)
}

async fn capture_card(
    cdp: &dyn Cdp,
    page: PageId,
    deck: &CardDeck,
    card: &SceneCard,
    path: &Path,
) -> ReelResult<()> {
    cdp.set_content(page, &render_card_html(deck, card)).await?;
    crate::session::wait_for_assets(cdp, page).await?;
    let png = cdp.screenshot(page, CAPTURE_DEADLINE).await?;
    tokio::fs::write(path, png).await?;
    Ok(())
}
