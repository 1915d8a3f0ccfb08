//! Parser for par2 command output
//!
//! Classification is driven by a [`MarkerSet`]: a fixed substring per outcome,
//! matched against the combined stdout and stderr of the tool. Per-file details
//! (damaged and missing names, block counts) are picked out line by line and
//! are informational only.

use super::traits::{RepairReport, VerifyReport};
use crate::config::Par2Dialect;
use crate::integrity::VerificationOutcome;

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited successfully (exit code 0)
    Success,
    /// The command exited with a non-zero exit code
    Failure,
}

impl ExitStatus {
    /// Returns `true` if the exit status represents success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<bool> for ExitStatus {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Report substrings a parity tool prints for each outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSet {
    /// Verification found every file intact
    pub complete: &'static str,
    /// Verification found damage that the recovery data can fix
    pub repairable: &'static str,
    /// Repair rebuilt the damaged files
    pub repaired: &'static str,
}

impl MarkerSet {
    /// Markers printed by par2j / par2j64
    pub const fn par2j() -> Self {
        Self {
            complete: "All Files Complete",
            repairable: "Ready to repair",
            repaired: "Repaired successfully",
        }
    }

    /// Markers printed by par2cmdline
    pub const fn par2cmdline() -> Self {
        Self {
            complete: "All files are correct",
            repairable: "Repair is possible",
            repaired: "Repair complete",
        }
    }

    /// Marker set for a tool dialect
    pub const fn for_dialect(dialect: Par2Dialect) -> Self {
        match dialect {
            Par2Dialect::Par2j => Self::par2j(),
            Par2Dialect::Par2Cmdline => Self::par2cmdline(),
        }
    }

    /// Classify a verification report
    ///
    /// The complete marker wins over the repairable one; text matching neither
    /// is `Unparseable`.
    pub fn classify_verify(&self, output: &str) -> VerificationOutcome {
        if output.contains(self.complete) {
            VerificationOutcome::AllComplete
        } else if output.contains(self.repairable) {
            VerificationOutcome::RepairableDamage
        } else {
            VerificationOutcome::Unparseable
        }
    }

    /// Classify a repair report
    pub fn classify_repair(&self, output: &str) -> VerificationOutcome {
        if output.contains(self.repaired) {
            VerificationOutcome::RepairSucceeded
        } else {
            VerificationOutcome::RepairFailed
        }
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    format!("{}\n{}", stdout, stderr)
}

/// Parse output from a verify (`v`) run
pub fn parse_verify_output(stdout: &str, stderr: &str, markers: &MarkerSet) -> VerifyReport {
    let combined = combine(stdout, stderr);

    let mut damaged_blocks = 0;
    let mut recovery_blocks_available = 0;
    let mut damaged_files = Vec::new();
    let mut missing_files = Vec::new();

    for line in combined.lines() {
        let line_lower = line.to_lowercase();

        if (line_lower.contains("damaged") || line_lower.contains("missing"))
            && let Some(count) = extract_number_before_blocks(&line_lower)
        {
            damaged_blocks = damaged_blocks.max(count);
        }

        if line_lower.contains("recovery")
            && line_lower.contains("block")
            && let Some(count) = extract_number_before_blocks(&line_lower)
        {
            recovery_blocks_available = recovery_blocks_available.max(count);
        }

        if (line_lower.contains("damaged:") || line_lower.contains("corrupt:"))
            && let Some(filename) = line.split(':').nth(1)
        {
            push_unique(&mut damaged_files, filename.trim());
        }

        if line_lower.contains("missing:")
            && let Some(filename) = line.split(':').nth(1)
        {
            push_unique(&mut missing_files, filename.trim());
        }

        // par2cmdline: Target: "filename" - missing.
        if line_lower.contains("- missing")
            && let Some(filename) = extract_filename_from_line(line)
        {
            push_unique(&mut missing_files, &filename);
        }

        // par2cmdline: Target: "filename" - damaged.
        if line_lower.contains("- damaged")
            && let Some(filename) = extract_filename_from_line(line)
        {
            push_unique(&mut damaged_files, &filename);
        }
    }

    VerifyReport {
        outcome: markers.classify_verify(&combined),
        damaged_blocks,
        recovery_blocks_available,
        damaged_files,
        missing_files,
        output: combined,
    }
}

/// Parse output from a repair (`r`) run
///
/// Success is decided by the repaired marker alone; the exit status only
/// supplies an error message when the output has none.
pub fn parse_repair_output(
    stdout: &str,
    stderr: &str,
    exit_status: ExitStatus,
    markers: &MarkerSet,
) -> RepairReport {
    let combined = combine(stdout, stderr);

    let mut repaired_files = Vec::new();
    let mut failed_files = Vec::new();
    let mut error = None;

    for line in combined.lines() {
        let line_lower = line.to_lowercase();

        if (line_lower.contains("repaired") || line_lower.contains("restored"))
            && let Some(filename) = extract_filename_from_line(line)
        {
            push_unique(&mut repaired_files, &filename);
        }

        if (line_lower.contains("failed") || line_lower.contains("could not repair"))
            && let Some(filename) = extract_filename_from_line(line)
        {
            push_unique(&mut failed_files, &filename);
        }

        if line_lower.contains("error") && error.is_none() {
            error = Some(line.trim().to_string());
        }
    }

    let outcome = markers.classify_repair(&combined);

    if outcome == VerificationOutcome::RepairFailed && error.is_none() {
        let stderr = stderr.trim();
        error = Some(if !stderr.is_empty() {
            stderr.to_string()
        } else if exit_status.is_success() {
            "repair marker not found in tool output".to_string()
        } else {
            "repair tool exited with failure".to_string()
        });
    }

    RepairReport {
        outcome,
        repaired_files,
        failed_files,
        error,
        output: combined,
    }
}

fn push_unique(list: &mut Vec<String>, filename: &str) {
    if !filename.is_empty() && !list.iter().any(|f| f == filename) {
        list.push(filename.to_string());
    }
}

/// Extract a number that appears before the word "block" or "blocks" in a line.
///
/// Handles:
/// - "5 blocks damaged"
/// - "Found 1999 of 2000 data blocks"
/// - "You have 577 recovery blocks available"
fn extract_number_before_blocks(line: &str) -> Option<u32> {
    let words: Vec<&str> = line.split_whitespace().collect();

    for (i, word) in words.iter().enumerate() {
        if word.starts_with("block") {
            // nearest number before "block(s)", skipping words like "recovery"
            if let Some(num) = words[..i].iter().rev().find_map(|w| w.parse::<u32>().ok()) {
                return Some(num);
            }
        }
    }
    None
}

/// Extract filename from a line (quoted string first, else the text after a colon)
fn extract_filename_from_line(line: &str) -> Option<String> {
    if let Some(start) = line.find('"')
        && let Some(end) = line[start + 1..].find('"')
    {
        return Some(line[start + 1..start + 1 + end].to_string());
    }

    if let Some(filename) = line.split(':').nth(1) {
        let filename = filename.trim().to_string();
        if !filename.is_empty() {
            return Some(filename);
        }
    }

    None
}
