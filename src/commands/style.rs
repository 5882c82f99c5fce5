use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const MATPLOTLIBRC: &str = "matplotlibrc";
pub const IPYTHON_CONFIG: &str = "ipython_config.py";

/// seaborn's "bright" palette.
pub const BRIGHT_PALETTE: [&str; 10] = [
    "023eff", "ff7c00", "1ac938", "e8000b", "8b2be2", "9f4800", "f14cc1", "a3a3a3", "ffc400",
    "00d7ff",
];

/// Figure theme for notebook plots: white background with outward ticks,
/// large paper-context fonts, thick lines and high-resolution output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotStyle {
    /// Scale applied to seaborn's notebook sizes for the "paper" context.
    pub context_scale: f64,
    /// Additional scale applied to font sizes only.
    pub font_scale: f64,
    pub palette: Vec<String>,
    pub line_width: f64,
    pub axes_line_width: f64,
    pub major_tick_width: f64,
    pub minor_tick_width: f64,
    pub font_weight: String,
    pub figure_size: (f64, f64),
    pub savefig_dpi: u32,
    pub inline_formats: Vec<String>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            context_scale: 0.8,
            font_scale: 2.25,
            palette: BRIGHT_PALETTE.iter().map(|c| c.to_string()).collect(),
            line_width: 3.0,
            axes_line_width: 2.5,
            major_tick_width: 2.5,
            minor_tick_width: 1.0,
            font_weight: "medium".to_string(),
            figure_size: (12.0, 8.0),
            savefig_dpi: 300,
            inline_formats: vec!["retina".to_string()],
        }
    }
}

impl PlotStyle {
    pub fn rc_params(&self) -> Vec<(&'static str, String)> {
        let font = |base: f64| num(base * self.context_scale * self.font_scale);
        let size = |base: f64| num(base * self.context_scale);
        let palette = self
            .palette
            .iter()
            .map(|c| format!("'{}'", c.trim_start_matches('#')))
            .collect::<Vec<_>>()
            .join(", ");

        vec![
            // "white" axes with "ticks"
            ("axes.facecolor", "white".to_string()),
            ("axes.edgecolor", ".15".to_string()),
            ("axes.labelcolor", ".15".to_string()),
            ("axes.grid", "False".to_string()),
            ("axes.axisbelow", "True".to_string()),
            ("figure.facecolor", "white".to_string()),
            ("text.color", ".15".to_string()),
            ("xtick.color", ".15".to_string()),
            ("ytick.color", ".15".to_string()),
            ("xtick.direction", "out".to_string()),
            ("ytick.direction", "out".to_string()),
            ("xtick.bottom", "True".to_string()),
            ("ytick.left", "True".to_string()),
            ("lines.solid_capstyle", "round".to_string()),
            // paper context
            ("font.size", font(12.0)),
            ("axes.labelsize", font(12.0)),
            ("axes.titlesize", font(12.0)),
            ("xtick.labelsize", font(11.0)),
            ("ytick.labelsize", font(11.0)),
            ("legend.fontsize", font(11.0)),
            ("legend.title_fontsize", font(12.0)),
            ("lines.markersize", size(6.0)),
            ("xtick.major.size", size(6.0)),
            ("ytick.major.size", size(6.0)),
            ("xtick.minor.size", size(4.0)),
            ("ytick.minor.size", size(4.0)),
            ("axes.prop_cycle", format!("cycler('color', [{}])", palette)),
            // overrides
            ("lines.linewidth", num(self.line_width)),
            ("axes.linewidth", num(self.axes_line_width)),
            ("xtick.major.width", num(self.major_tick_width)),
            ("ytick.major.width", num(self.major_tick_width)),
            ("xtick.minor.width", num(self.minor_tick_width)),
            ("ytick.minor.width", num(self.minor_tick_width)),
            ("font.weight", self.font_weight.clone()),
            (
                "figure.figsize",
                format!("{}, {}", num(self.figure_size.0), num(self.figure_size.1)),
            ),
            ("savefig.dpi", self.savefig_dpi.to_string()),
        ]
    }
}

/// Up to two decimals, without trailing zeros.
fn num(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn render_matplotlibrc(style: &PlotStyle) -> String {
    let mut out = String::from("# Generated by kernel-prep\n");
    for (key, value) in style.rc_params() {
        out.push_str(&format!("{}: {}\n", key, value));
    }
    out
}

pub fn render_ipython_config(style: &PlotStyle) -> String {
    let formats = style
        .inline_formats
        .iter()
        .map(|f| format!("'{}'", f))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "# Generated by kernel-prep\nc = get_config()  # noqa\nc.InlineBackend.figure_formats = {{{}}}\n",
        formats
    )
}

#[derive(Debug, Serialize)]
pub struct StyleResult {
    pub files: Vec<PathBuf>,
}

pub fn cmd_style(dir: &Path, style: &PlotStyle, force: bool) -> Result<StyleResult> {
    let outputs = [
        (dir.join(MATPLOTLIBRC), render_matplotlibrc(style)),
        (dir.join(IPYTHON_CONFIG), render_ipython_config(style)),
    ];

    if !force {
        if let Some((path, _)) = outputs.iter().find(|(path, _)| path.exists()) {
            bail!(
                "{} already exists\nUse --force to overwrite.",
                path.display()
            );
        }
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let mut files = Vec::new();
    for (path, content) in outputs {
        write_atomic(&path, &content)?;
        files.push(path);
    }

    Ok(StyleResult { files })
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename {} to {}", tmp_path.display(), path.display()))
}

pub fn format_style_human(result: &StyleResult) -> String {
    let mut lines: Vec<String> = result
        .files
        .iter()
        .map(|f| format!("Wrote {}", f.display()))
        .collect();
    if let Some(dir) = result.files.first().and_then(|f| f.parent()) {
        lines.push(format!(
            "Hint: set MATPLOTLIBRC={} and copy {} into your IPython profile",
            dir.display(),
            IPYTHON_CONFIG
        ));
    }
    lines.join("\n")
}
