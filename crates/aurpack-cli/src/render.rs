use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use aurpack_builder::SyncOutcome;
use aurpack_core::Origin;
use aurpack_resolver::InstallPlan;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    if std::io::stdout().is_terminal() && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct TerminalSpinner {
    progress_bar: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub(crate) fn current() -> Self {
        Self {
            style: current_output_style(),
        }
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        let line = render_status_line(self.style, status, message);
        match self.style {
            OutputStyle::Plain => println!("{line}"),
            OutputStyle::Rich => {
                let badge = status_badge(status);
                let rest = line.strip_prefix(badge).unwrap_or(&line);
                println!("{}{rest}", colorize(status_style(status), badge));
            }
        }
    }

    pub(crate) fn print_section(self, title: &str) {
        if let Some(line) = render_section_header(self.style, title) {
            println!();
            println!("{}", colorize(section_style(), &line));
        }
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn start_spinner(self, message: &str) -> TerminalSpinner {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}")
            {
                progress_bar.set_style(style.tick_chars("|/-\\ "));
            }
            progress_bar.set_message(message.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };
        TerminalSpinner { progress_bar }
    }
}

impl TerminalSpinner {
    pub(crate) fn finish(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "err" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightBlack,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(format!("== {title} ==")),
    }
}

/// Status and message summarizing one sync, build or install request.
pub(crate) fn outcome_status(
    verb: &str,
    name: &str,
    outcome: &SyncOutcome,
) -> (&'static str, String) {
    if !outcome.changed {
        return ("skip", format!("{name} is up to date"));
    }
    ("ok", format!("{verb} {name} ({})", outcome.packages.join(", ")))
}

/// One line per package: the package followed by its direct dependencies.
pub(crate) fn format_graph_lines(plan: &InstallPlan) -> Vec<String> {
    plan.graph
        .nodes()
        .iter()
        .map(|node| {
            let dependencies = plan
                .graph
                .dependencies_of(&node.name)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            if dependencies.is_empty() {
                node.to_string()
            } else {
                format!("{node} -> {}", dependencies.join(", "))
            }
        })
        .collect()
}

pub(crate) fn format_order_lines(plan: &InstallPlan) -> Vec<String> {
    plan.ordered()
        .enumerate()
        .map(|(step, node)| format!("{}. {node}", step + 1))
        .collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphReport {
    pub(crate) root: Option<String>,
    pub(crate) packages: Vec<GraphPackage>,
    pub(crate) order: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphPackage {
    pub(crate) name: String,
    pub(crate) origin: Origin,
    pub(crate) version: String,
    pub(crate) arch: String,
    pub(crate) installed_version: Option<String>,
    pub(crate) dependencies: Vec<String>,
}

impl GraphReport {
    pub(crate) fn from_plan(plan: &InstallPlan) -> Self {
        let packages = plan
            .graph
            .nodes()
            .iter()
            .map(|node| GraphPackage {
                name: node.name.clone(),
                origin: node.origin,
                version: node.version.clone(),
                arch: node.arch.clone(),
                installed_version: node
                    .installed
                    .as_ref()
                    .map(|release| release.version.clone()),
                dependencies: plan
                    .graph
                    .dependencies_of(&node.name)
                    .iter()
                    .map(|dependency| dependency.name.clone())
                    .collect(),
            })
            .collect();
        Self {
            root: plan.root().map(|node| node.name.clone()),
            packages,
            order: plan.ordered().map(|node| node.name.clone()).collect(),
        }
    }
}
