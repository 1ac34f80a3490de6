/// Equation Renderer
///
/// Walks the level rows in order and emits math-mode markup:
///
/// - Middle rows only contribute their connective (`}{` for a fraction bar,
///   `}_{` for a summation sign); the surrounding top and bottom rows carry the content
/// - The first symbol of a top row opens the stack (` \frac{`, ` \sum^{`) or, for a
///   limit operator, opens `\lim_{` and ends the row
/// - Script depth changes open `^{` / `_{` and close `}`; an unchanged nonzero depth
///   emits a separating space
/// - Radicals open `{` and close after `extend_count` following symbols
/// - Bottom rows and scripted row endings close what they opened
///
/// A final pass balances the group markers, so every output is syntactically valid
/// even when the geometry was misread.
use super::levels::{group_levels, LevelRow};
use super::ligature::LigatureCombiner;
use super::RenderSymbol;
use crate::pipeline_modular::types::StackRole;
use serde::{Deserialize, Serialize};

/// Math-mode start and end marker
pub const MATH_DELIMITER: char = '$';

const CAPITAL_PREFIX: &str = "capital_";
const SQRT: &str = "\\sqrt";
const SUM: &str = "\\sum";
const LIM: &str = "\\lim";
const LOG: &str = "\\log";
const FRACTION_BAR: &str = "-";

/// Symbols that never carry a script on the following symbol
const NO_SCRIPT_AFTER: [&str; 3] = ["+", "-", "="];
/// Symbols that never start a script group
const NO_SCRIPT_START: [&str; 3] = ["=", "\\lt", "\\gt"];

/// Options for equation rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Collapse multi-glyph function names and letter confusions
    ///
    /// Default: `true`
    pub ligatures: bool,

    /// Replace `\lt` / `\gt` with literal `<` / `>` in the final string
    ///
    /// Default: `true`
    pub substitute_comparisons: bool,
}

impl Default for RenderOptions {
    #[inline]
    fn default() -> Self {
        Self {
            ligatures: true,
            substitute_comparisons: true,
        }
    }
}

/// Converts classified symbols plus layout metadata into a markup string
#[derive(Debug, Clone, Copy, Default)]
pub struct EquationRenderer {
    options: RenderOptions,
    combiner: LigatureCombiner,
}

impl EquationRenderer {
    #[inline]
    #[must_use = "renderer is created but not used"]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use = "renderer is created but not used"]
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            options,
            combiner: LigatureCombiner::default(),
        }
    }

    #[inline]
    #[must_use = "renderer is created but not used"]
    pub const fn with_combiner(mut self, combiner: LigatureCombiner) -> Self {
        self.combiner = combiner;
        self
    }

    /// Render symbols to a `$`-delimited markup string with balanced groups
    #[must_use]
    pub fn render(&self, symbols: &[RenderSymbol]) -> String {
        let mut rows = group_levels(symbols);
        let mut body = String::new();

        for index in 0..rows.len() {
            let connective = rows
                .get(index + 1)
                .filter(|next| next.role == StackRole::Middle)
                .and_then(LevelRow::first_label)
                .map(str::to_owned);
            self.render_row(&mut rows[index], connective.as_deref(), &mut body);
        }

        let balanced = balance_groups(body.trim_start());
        let mut markup = format!("{MATH_DELIMITER}{balanced}{MATH_DELIMITER}");
        if self.options.substitute_comparisons {
            markup = markup.replace("\\lt", "<").replace("\\gt", ">");
        }

        log::debug!(
            "Rendered {} symbols in {} levels: {markup}",
            symbols.len(),
            rows.len()
        );
        markup
    }

    fn render_row(&self, row: &mut LevelRow, connective: Option<&str>, out: &mut String) {
        if row.role == StackRole::Middle {
            match row.first_label() {
                Some(SUM) => out.push_str("}_{"),
                Some(FRACTION_BAR) => out.push_str("}{"),
                _ => {}
            }
            return;
        }

        for label in &mut row.labels {
            if let Some(stripped) = label.strip_prefix(CAPITAL_PREFIX) {
                *label = stripped.to_string();
            }
        }
        if self.options.ligatures {
            self.combiner.combine(row);
        }

        let last = row.len().saturating_sub(1);
        for s in 0..row.len() {
            let suppress_close = s > 0 && correct_operator_script(row, s);
            if s > 0 {
                force_log_subscript(row, s);
            }

            let prev = if s == 0 { 0 } else { row.scripts[s - 1] };
            let cur = row.scripts[s];
            if cur != 0 {
                if cur.abs() > prev.abs() {
                    out.push_str(if cur > 0 { "^{" } else { "_{" });
                } else {
                    out.push(' ');
                }
            }
            if cur.abs() < prev.abs() && !suppress_close {
                out.push('}');
            }

            let label = row.labels[s].as_str();
            if row.role == StackRole::Top && s == 0 {
                match connective {
                    Some(SUM) => out.push_str(" \\sum^{"),
                    Some(FRACTION_BAR) => out.push_str(" \\frac{"),
                    _ => {}
                }
                if label == LIM {
                    out.push_str(" \\lim_{");
                    break;
                }
            }

            if !out.ends_with(' ') {
                out.push(' ');
            }
            out.push_str(if label == "adiv" { "/" } else { label });
            match label {
                SUM => out.push_str("_{"),
                SQRT => {
                    out.push('{');
                    if row.extends[s] == 0 {
                        out.push('}');
                    }
                }
                _ => {}
            }

            for q in 1..=s {
                if row.labels[s - q] == SQRT && row.extends[s - q] == q {
                    out.push('}');
                }
            }

            if s == last {
                if row.role == StackRole::Bottom {
                    out.push('}');
                }
                for _ in 0..cur.unsigned_abs() {
                    out.push('}');
                }
            }
        }
    }
}

/// Cancel a script change that starts after an operator or on a relation sign
///
/// Shifts the whole row by one level back towards the previous depth. Returns true
/// when a shift happened; the closing marker of that step must then be skipped.
fn correct_operator_script(row: &mut LevelRow, s: usize) -> bool {
    let (prev, cur) = (row.scripts[s - 1], row.scripts[s]);
    let operator = NO_SCRIPT_AFTER.contains(&row.labels[s - 1].as_str())
        || NO_SCRIPT_START.contains(&row.labels[s].as_str());
    if !operator || prev == cur || cur == 0 {
        return false;
    }
    row.shift_scripts(0, if cur > prev { -1 } else { 1 });
    true
}

/// The argument of a logarithm sits exactly one level below it
fn force_log_subscript(row: &mut LevelRow, s: usize) {
    if row.labels[s - 1] != LOG {
        return;
    }
    let target = row.scripts[s - 1] - 1;
    if row.scripts[s] != target {
        let delta = target - row.scripts[s];
        row.shift_scripts(s, delta);
    }
}

/// Drop closing markers without an opener and append the missing ones
///
/// `\{` and `\}` are literal braces and do not count.
#[must_use]
pub fn balance_groups(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len() + 4);
    let mut depth = 0usize;
    let mut dropped = 0usize;
    let mut escaped = false;

    for c in markup.chars() {
        let literal = escaped;
        escaped = c == '\\' && !escaped;
        if !literal {
            if c == '{' {
                depth += 1;
            } else if c == '}' {
                if depth == 0 {
                    dropped += 1;
                    continue;
                }
                depth -= 1;
            }
        }
        out.push(c);
    }

    if dropped > 0 || depth > 0 {
        log::warn!("Unbalanced markup: dropped {dropped} closers, appended {depth}");
    }
    out.extend(std::iter::repeat('}').take(depth));
    out
}
