//! Parameter and result types exchanged through the [`crate::Cdp`] interface.

use serde::{Deserialize, Serialize};

/// A matched element: centre point in CSS pixels plus its visible text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub text: String,
}

/// Fixed viewport applied to the recording page.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale")]
    pub device_scale_factor: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Viewport {
    pub fn full_hd() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
        }
    }

    pub fn window_size_arg(&self) -> String {
        format!("--window-size={},{}", self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::full_hd()
    }
}

const MM_PER_INCH: f64 = 25.4;

/// `Page.printToPDF` parameters. Lengths are in inches, as the protocol expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrintOptions {
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margin_top_in: f64,
    pub margin_bottom_in: f64,
    pub margin_left_in: f64,
    pub margin_right_in: f64,
    pub display_header_footer: bool,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
}

impl PrintOptions {
    /// A4 portrait, no margins, no header or footer.
    pub fn a4() -> Self {
        Self {
            paper_width_in: 210.0 / MM_PER_INCH,
            paper_height_in: 297.0 / MM_PER_INCH,
            margin_top_in: 0.0,
            margin_bottom_in: 0.0,
            margin_left_in: 0.0,
            margin_right_in: 0.0,
            display_header_footer: false,
            header_template: None,
            footer_template: None,
            print_background: true,
            prefer_css_page_size: false,
        }
    }

    pub fn with_margins_mm(mut self, top: f64, bottom: f64, left: f64, right: f64) -> Self {
        self.margin_top_in = top / MM_PER_INCH;
        self.margin_bottom_in = bottom / MM_PER_INCH;
        self.margin_left_in = left / MM_PER_INCH;
        self.margin_right_in = right / MM_PER_INCH;
        self
    }

    pub fn with_header_footer(mut self, header: String, footer: String) -> Self {
        self.display_header_footer = true;
        self.header_template = Some(header);
        self.footer_template = Some(footer);
        self
    }

    pub fn to_params(&self) -> serde_json::Value {
        let mut params = serde_json::json!({
            "paperWidth": self.paper_width_in,
            "paperHeight": self.paper_height_in,
            "marginTop": self.margin_top_in,
            "marginBottom": self.margin_bottom_in,
            "marginLeft": self.margin_left_in,
            "marginRight": self.margin_right_in,
            "displayHeaderFooter": self.display_header_footer,
            "printBackground": self.print_background,
            "preferCSSPageSize": self.prefer_css_page_size,
        });
        if self.display_header_footer {
            // Chromium substitutes a default header when the template is absent.
            params["headerTemplate"] = self
                .header_template
                .clone()
                .unwrap_or_else(|| "<span></span>".to_string())
                .into();
            params["footerTemplate"] = self
                .footer_template
                .clone()
                .unwrap_or_else(|| "<span></span>".to_string())
                .into();
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_margins_convert_from_millimetres() {
        let opts = PrintOptions::a4().with_margins_mm(25.0, 25.0, 15.0, 15.0);
        assert!((opts.margin_top_in - 0.984).abs() < 0.001);
        assert!((opts.margin_left_in - 0.591).abs() < 0.001);
        assert!((opts.paper_width_in - 8.268).abs() < 0.001);
    }

    #[test]
    fn header_templates_only_sent_when_enabled() {
        let plain = PrintOptions::a4().to_params();
        assert!(plain.get("headerTemplate").is_none());
        assert_eq!(plain["displayHeaderFooter"], false);

        let formal = PrintOptions::a4()
            .with_header_footer("<div>h</div>".into(), "<div>f</div>".into())
            .to_params();
        assert_eq!(formal["headerTemplate"], "<div>h</div>");
        assert_eq!(formal["footerTemplate"], "<div>f</div>");
    }

    #[test]
    fn window_size_argument_matches_viewport() {
        assert_eq!(Viewport::full_hd().window_size_arg(), "--window-size=1920,1080");
    }
}
