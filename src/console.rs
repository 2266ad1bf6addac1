use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use bourbon_core::{BottleRecord, PriceCheck, PricePosition};
use colored::{ColoredString, Colorize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tone {
    Plain,
    Good,
    Bad,
    Warn,
    Notice,
}

impl Tone {
    fn apply(self, text: &str) -> ColoredString {
        match self {
            Tone::Plain => text.normal(),
            Tone::Good => text.green().bold(),
            Tone::Bad => text.red().bold(),
            Tone::Warn => text.yellow(),
            Tone::Notice => text.yellow().bold(),
        }
    }
}

struct Cell {
    text: String,
    tone: Tone,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Plain,
        }
    }
}

/// Output context for CLI commands. Holds the writer and whether ANSI
/// styling is enabled.
pub struct Console<W: Write> {
    out: W,
    color: bool,
}

impl Console<io::Stdout> {
    /// Console on stdout; color only when attached to a terminal and
    /// `NO_COLOR` is unset.
    pub fn stdout(color: bool) -> Self {
        let out = io::stdout();
        let color = color && out.is_terminal() && std::env::var_os("NO_COLOR").is_none();
        if !color {
            colored::control::set_override(false);
        }
        Self::new(out, color)
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn success(&mut self, message: &str) -> Result<()> {
        self.line(Tone::Good, message)
    }

    pub fn warn(&mut self, message: &str) -> Result<()> {
        self.line(Tone::Warn, message)
    }

    pub fn info(&mut self, message: &str) -> Result<()> {
        self.line(Tone::Plain, message)
    }

    /// Print a prompt and read one line of input. EOF is an error.
    pub fn prompt<R: BufRead>(&mut self, input: &mut R, label: &str) -> Result<String> {
        write!(self.out, "{label}: ")?;
        self.out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            bail!("no input provided for {label}");
        }
        Ok(line.trim().to_string())
    }

    /// Prompt until the answer parses as a price.
    pub fn prompt_price<R: BufRead>(&mut self, input: &mut R, label: &str) -> Result<f64> {
        loop {
            let answer = self.prompt(input, label)?;
            match answer.parse::<f64>() {
                Ok(value) if value.is_finite() => return Ok(value),
                _ => self.warn(&format!("'{answer}' is not a valid price"))?,
            }
        }
    }

    pub fn print_records(&mut self, title: &str, records: &[BottleRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            return self.no_results();
        };
        let headers = first.columns().to_vec();
        let rows = records
            .iter()
            .map(|record| {
                record
                    .values()
                    .iter()
                    .map(|value| Cell::plain(value.to_string()))
                    .collect()
            })
            .collect();
        self.print_table(title, &headers, rows)
    }

    pub fn print_price_checks(&mut self, title: &str, checks: &[PriceCheck]) -> Result<()> {
        let Some(first) = checks.first() else {
            return self.no_results();
        };
        let mut headers = first.record.columns().to_vec();
        headers.push("Percentage Difference".to_string());
        let rows = checks
            .iter()
            .map(|check| {
                let mut cells: Vec<Cell> = check
                    .record
                    .values()
                    .iter()
                    .map(|value| Cell::plain(value.to_string()))
                    .collect();
                cells.push(difference_cell(check));
                cells
            })
            .collect();
        self.print_table(title, &headers, rows)
    }

    fn no_results(&mut self) -> Result<()> {
        self.line(Tone::Notice, "No bottles found. Try `bourbon update`?")
    }

    fn line(&mut self, tone: Tone, message: &str) -> Result<()> {
        let styled = self.paint(message, tone, false);
        writeln!(self.out, "{styled}")?;
        Ok(())
    }

    fn paint(&self, text: &str, tone: Tone, shaded: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        let styled = tone.apply(text);
        if shaded {
            styled.on_truecolor(40, 40, 40).to_string()
        } else {
            styled.to_string()
        }
    }

    fn print_table(&mut self, title: &str, headers: &[String], rows: Vec<Vec<Cell>>) -> Result<()> {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (index, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(index) {
                    *width = (*width).max(cell.text.chars().count());
                }
            }
        }
        let total: usize = widths.iter().map(|w| w + 3).sum::<usize>().saturating_sub(1);

        writeln!(self.out, "{title:^total$}")?;
        let header_cells: Vec<Cell> = headers.iter().map(|h| Cell::plain(h.as_str())).collect();
        self.write_row(&header_cells, &widths, false)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        writeln!(self.out, "{}", rule.join("+"))?;
        for (index, row) in rows.iter().enumerate() {
            self.write_row(row, &widths, index % 2 == 1)?;
        }
        Ok(())
    }

    fn write_row(&mut self, cells: &[Cell], widths: &[usize], shaded: bool) -> Result<()> {
        let mut segments: Vec<(String, Tone)> = widths
            .iter()
            .enumerate()
            .map(|(index, &width)| {
                let (text, tone) = cells
                    .get(index)
                    .map(|cell| (cell.text.as_str(), cell.tone))
                    .unwrap_or(("", Tone::Plain));
                (format!(" {text:<width$} "), tone)
            })
            .collect();
        if let Some((last, _)) = segments.last_mut() {
            last.truncate(last.trim_end().len());
        }

        let mut line = String::new();
        for (index, (text, tone)) in segments.iter().enumerate() {
            if index > 0 {
                line.push_str(&self.paint("|", Tone::Plain, shaded));
            }
            line.push_str(&self.paint(text, *tone, shaded));
        }
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

/// `16.67% above average` in red when the asking price is above the
/// average, green otherwise.
fn difference_cell(check: &PriceCheck) -> Cell {
    match (check.percentage_difference, check.position) {
        (Some(difference), Some(position)) => Cell {
            text: format!("{:.2}% {}", difference.abs(), position.as_str()),
            tone: match position {
                PricePosition::Above => Tone::Bad,
                PricePosition::Below => Tone::Good,
            },
        },
        _ => Cell::plain("n/a"),
    }
}
