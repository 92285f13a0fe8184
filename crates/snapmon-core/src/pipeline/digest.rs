//! Notification formatter
//!
//! Renders a change set into the digest text. Consumers may match on these
//! lines; keep the wording stable:
//!
//! ```text
//! RDS Snapshot Status Update Summary (2 changes)
//!
//! Region: us-west-2
//! ----------------------------------------
//! Snapshot: snap-1
//! DB Instance: snap-1
//! Status: New snapshot - Status: available
//!
//! Snapshot: snap-2
//! DB Instance: snap-2
//! Status: Status changed from creating to available
//!
//! ```

use std::fmt::Write;

use crate::snapshot::StatusChange;

const REGION_RULE: &str = "----------------------------------------";

/// Render `changes` as one digest
///
/// Regions appear in the order they are first seen in `changes`; within a
/// region the input order is kept. The output is fully determined by the
/// input.
pub fn format_digest(changes: &[StatusChange]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "RDS Snapshot Status Update Summary ({} changes)\n",
        changes.len()
    );

    let mut regions: Vec<(&str, Vec<&StatusChange>)> = Vec::new();
    for change in changes {
        match regions.iter_mut().find(|(region, _)| *region == change.region) {
            Some((_, group)) => group.push(change),
            None => regions.push((change.region.as_str(), vec![change])),
        }
    }

    for (region, group) in regions {
        let _ = writeln!(out, "Region: {}", region);
        let _ = writeln!(out, "{}", REGION_RULE);

        for change in group {
            let _ = writeln!(out, "Snapshot: {}", change.identifier);
            let _ = writeln!(out, "DB Instance: {}", change.display_label);
            let _ = writeln!(out, "Status: {}\n", status_line(change));
        }
    }

    out
}

fn status_line(change: &StatusChange) -> String {
    match &change.previous_status {
        None => format!("New snapshot - Status: {}", change.current_status),
        Some(previous) => format!(
            "Status changed from {} to {}",
            previous, change.current_status
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(region: &str, id: &str, previous: Option<&str>, current: &str) -> StatusChange {
        StatusChange {
            identifier: id.to_string(),
            previous_status: previous.map(str::to_string),
            current_status: current.to_string(),
            region: region.to_string(),
            display_label: id.to_string(),
        }
    }

    #[test]
    fn test_empty_digest() {
        let digest = format_digest(&[]);
        assert_eq!(digest, "RDS Snapshot Status Update Summary (0 changes)\n\n");
        assert!(!digest.contains("Region:"));
    }

    #[test]
    fn test_new_snapshot_line() {
        let digest = format_digest(&[change("us-west-2", "snap-1", None, "available")]);
        assert!(digest.contains("(1 changes)"));
        assert!(digest.contains("New snapshot - Status: available"));
        assert!(digest.contains("Snapshot: snap-1\nDB Instance: snap-1\n"));
    }

    #[test]
    fn test_transition_line() {
        let digest = format_digest(&[change("us-west-2", "snap-1", Some("creating"), "available")]);
        assert!(digest.contains("Status changed from creating to available"));
    }

    #[test]
    fn test_exact_layout() {
        let digest = format_digest(&[
            change("us-west-2", "snap-1", None, "available"),
            change("us-west-2", "snap-2", Some("creating"), "available"),
        ]);

        let expected = "RDS Snapshot Status Update Summary (2 changes)\n\
                        \n\
                        Region: us-west-2\n\
                        ----------------------------------------\n\
                        Snapshot: snap-1\n\
                        DB Instance: snap-1\n\
                        Status: New snapshot - Status: available\n\
                        \n\
                        Snapshot: snap-2\n\
                        DB Instance: snap-2\n\
                        Status: Status changed from creating to available\n\
                        \n";
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_region_grouping_is_first_seen_and_stable() {
        let changes = vec![
            change("eu-west-1", "a", None, "available"),
            change("us-east-1", "b", None, "failed"),
            change("eu-west-1", "c", Some("creating"), "available"),
        ];

        let digest = format_digest(&changes);
        assert_eq!(digest, format_digest(&changes));

        let eu = digest.find("Region: eu-west-1").unwrap();
        let us = digest.find("Region: us-east-1").unwrap();
        assert!(eu < us);
        assert_eq!(digest.matches("Region: eu-west-1").count(), 1);

        // "c" is listed inside the eu-west-1 section, before us-east-1 starts
        let c = digest.find("Snapshot: c").unwrap();
        assert!(eu < c && c < us);
    }
}
