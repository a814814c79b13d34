use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::list::Summary;
use crate::task::{Label, Task, User};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "no tasks")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "".to_string(),
            "Pri".to_string(),
            "Deadline".to_string(),
            "Title".to_string(),
            "Labels".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let deadline = task
                .deadline
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string();
            let deadline = if task.is_overdue(now) {
                self.paint(&deadline, "31")
            } else {
                deadline
            };

            let check = if task.completed {
                self.paint("x", "32")
            } else {
                " ".to_string()
            };

            let labels = task
                .labels
                .iter()
                .map(|name| format!("+{name}"))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                self.paint(&task.id, "33"),
                check,
                task.priority.to_string(),
                deadline,
                task.title.clone(),
                labels,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, summary))]
    pub fn print_summary(&mut self, summary: Summary) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let overdue = summary.overdue.to_string();
        let overdue = if summary.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(
            out,
            "{} total, {} pending, {} completed, {} overdue",
            summary.total, summary.pending, summary.completed, overdue
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, labels))]
    pub fn print_label_table(&mut self, labels: &[Label]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if labels.is_empty() {
            writeln!(out, "no labels")?;
            return Ok(());
        }

        let headers = vec!["ID".to_string(), "Name".to_string(), "Color".to_string()];
        let rows = labels
            .iter()
            .map(|label| {
                vec![
                    self.paint(&label.id, "33"),
                    label.name.clone(),
                    label.color.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_user(&mut self, user: &User) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{} <{}>", user.display_name(), user.email)?;
        Ok(())
    }

    /// One line per notification, on stderr so tables stay pipeable.
    pub fn print_notices(&mut self, notices: &[String]) -> anyhow::Result<()> {
        let mut err = io::stderr().lock();
        for notice in notices {
            writeln!(err, "{notice}")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align_to_widest_cell() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["ID".to_string(), "Title".to_string()],
            vec![
                vec!["t1".to_string(), "Pay rent".to_string()],
                vec!["t1234".to_string(), "Call".to_string()],
            ],
        )
        .expect("write table");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID    Title    ");
        assert_eq!(lines[2], "t1    Pay rent ");
        assert_eq!(lines[3], "t1234 Call     ");
    }

    #[test]
    fn ansi_codes_do_not_count_toward_width() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }
}
