//! Task progress output

use super::task::TaskName;
use colored::Colorize;
use std::time::Duration;

fn prefix() -> colored::ColoredString {
    "[plump]".dimmed()
}

pub fn starting(task: TaskName) {
    println!("{} Starting '{}'...", prefix(), task.as_str().cyan());
}

pub fn finished(task: TaskName, elapsed: Duration, files: usize) {
    println!(
        "{} Finished '{}' after {} ({} file{})",
        prefix(),
        task.as_str().cyan(),
        format_elapsed(elapsed).magenta(),
        files,
        if files == 1 { "" } else { "s" }
    );
}

pub fn failed(task: TaskName, error: &anyhow::Error) {
    eprintln!(
        "{} '{}' {}: {:#}",
        prefix(),
        task.as_str().cyan(),
        "errored".red().bold(),
        error
    );
}

pub fn warn(message: impl AsRef<str>) {
    eprintln!("{} {} {}", prefix(), "Warning:".yellow(), message.as_ref());
}

pub fn info(message: impl AsRef<str>) {
    println!("{} {}", prefix(), message.as_ref());
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2} s", elapsed.as_secs_f64())
    } else {
        format!("{} ms", elapsed.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(12)), "12 ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50 s");
    }
}
