//! Tree validation and health checking utilities.
//!
//! Verifies the structural invariants of a built tree:
//! - internal clusters have exactly two children (enforced by the type)
//! - `leaf_count` equals the sum of the children's counts
//! - a tree over n leaves has n - 1 internal clusters
//! - cluster ids are unique
//! - merge heights are finite and non-negative
//!
//! # Example
//!
//! ```rust
//! use upgma::{HealthCheck, Upgma};
//!
//! let tree = Upgma::new()
//!     .build(vec![4, 8, 15, 16, 23, 42], |a: &i32, b: &i32| f64::from((a - b).abs()))
//!     .unwrap();
//!
//! let report = tree.health_check();
//! assert!(report.is_healthy(), "{}", report);
//! ```

use std::collections::{HashMap, HashSet};

use super::node::Cluster;
use super::tree::UpgmaTree;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational, not a problem.
    Info,
    /// Something unusual but not necessarily wrong.
    Warning,
    /// A problem that should be fixed.
    Error,
    /// A broken invariant.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single validation issue found during health check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Cluster id involved, if any.
    pub cluster_id: Option<usize>,
    /// Optional additional context.
    pub context: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            cluster_id: None,
            context: None,
        }
    }

    /// Attach the cluster id this issue is about.
    pub fn with_cluster(mut self, id: usize) -> Self {
        self.cluster_id = Some(id);
        self
    }

    /// Add context to this issue.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(id) = self.cluster_id {
            write!(f, " (cluster {})", id)?;
        }
        if let Some(ctx) = &self.context {
            write!(f, " - {}", ctx)?;
        }
        Ok(())
    }
}

/// Report from a validation/health check.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Add a critical-level issue.
    pub fn critical(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Critical, message));
    }

    /// Check if the report contains no errors or critical issues.
    pub fn is_healthy(&self) -> bool {
        !self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    /// Check if there are any issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Count issues by severity.
    fn counts(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_default() += 1;
        }
        counts
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "Validation passed: no issues found");
        }

        let counts = self.counts();
        write!(f, "Validation report: ")?;

        let parts: Vec<String> = [
            (Severity::Critical, "critical"),
            (Severity::Error, "errors"),
            (Severity::Warning, "warnings"),
            (Severity::Info, "info"),
        ]
        .iter()
        .filter_map(|(sev, name)| counts.get(sev).map(|c| format!("{} {}", c, name)))
        .collect();

        writeln!(f, "{}", parts.join(", "))?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// Health report with additional statistics.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Validation issues.
    pub validation: ValidationReport,
    /// Total number of clusters (leaves and internal).
    pub cluster_count: usize,
    /// Number of leaves.
    pub leaf_count: usize,
    /// Longest root-to-leaf path, in edges.
    pub max_depth: usize,
    /// Largest merge height.
    pub max_height: f64,
}

impl HealthReport {
    /// Check if the tree is healthy (no errors or critical issues).
    pub fn is_healthy(&self) -> bool {
        self.validation.is_healthy()
    }
}

impl std::fmt::Display for HealthReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tree Health Report")?;
        writeln!(f, "==================")?;
        writeln!(f, "Clusters: {} ({} leaves)", self.cluster_count, self.leaf_count)?;
        writeln!(f, "Max depth: {}", self.max_depth)?;
        writeln!(f, "Max height: {:.4}", self.max_height)?;
        writeln!(f)?;
        write!(f, "{}", self.validation)
    }
}

/// Trait for types that can be health-checked.
pub trait HealthCheck {
    /// Perform a health check and return a report.
    fn health_check(&self) -> HealthReport;

    /// Quick check: returns true if healthy.
    fn is_healthy(&self) -> bool {
        self.health_check().is_healthy()
    }
}

impl<T> HealthCheck for Cluster<T> {
    fn health_check(&self) -> HealthReport {
        let validation = validate_cluster(self);

        let mut cluster_count = 0;
        let mut max_depth = 0;
        let mut max_height: f64 = 0.0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            cluster_count += 1;
            max_depth = max_depth.max(depth);
            max_height = max_height.max(node.height());
            if let Some((left, right)) = node.children() {
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
        }

        HealthReport {
            validation,
            cluster_count,
            leaf_count: self.flatten().count(),
            max_depth,
            max_height,
        }
    }
}

impl<T> HealthCheck for UpgmaTree<T> {
    fn health_check(&self) -> HealthReport {
        let mut report = self.root().health_check();
        let dendro = self.dendrogram();
        let n = self.leaf_count();

        if dendro.n_items() != n {
            report.validation.add(
                ValidationIssue::new(Severity::Critical, "dendrogram item count mismatch")
                    .with_context(format!("dendrogram {}, tree {}", dendro.n_items(), n)),
            );
        }
        if dendro.n_merges() != n.saturating_sub(1) {
            report.validation.add(
                ValidationIssue::new(Severity::Critical, "dendrogram merge count mismatch")
                    .with_context(format!(
                        "expected {}, found {}",
                        n.saturating_sub(1),
                        dendro.n_merges()
                    )),
            );
        }

        let sizes: HashMap<usize, usize> = self
            .root()
            .iter()
            .map(|c| (c.id(), c.leaf_count()))
            .collect();
        for (i, merge) in dendro.merges().enumerate() {
            let id = dendro.n_items() + i;
            if sizes.get(&id) != Some(&merge.size) {
                report.validation.add(
                    ValidationIssue::new(Severity::Error, "merge size disagrees with tree")
                        .with_cluster(id)
                        .with_context(format!("merge size {}", merge.size)),
                );
            }
        }

        report
    }
}

/// Validate the structural invariants of a cluster tree.
///
/// # Returns
/// A validation report with any issues found.
pub fn validate_cluster<T>(root: &Cluster<T>) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut seen = HashSet::new();
    let mut leaves = 0usize;
    let mut internal = 0usize;

    for node in root.iter() {
        if !seen.insert(node.id()) {
            report.add(
                ValidationIssue::new(Severity::Critical, "duplicate cluster id")
                    .with_cluster(node.id()),
            );
        }

        let height = node.height();
        if !height.is_finite() || height < 0.0 {
            report.add(
                ValidationIssue::new(Severity::Warning, "merge height is negative or not finite")
                    .with_cluster(node.id())
                    .with_context(format!("height {height}")),
            );
        }

        match node.children() {
            None => {
                leaves += 1;
                if node.leaf_count() != 1 {
                    report.add(
                        ValidationIssue::new(Severity::Error, "leaf reports leaf_count != 1")
                            .with_cluster(node.id())
                            .with_context(format!("leaf_count {}", node.leaf_count())),
                    );
                }
            }
            Some((left, right)) => {
                internal += 1;
                let expected = left.leaf_count() + right.leaf_count();
                if node.leaf_count() != expected {
                    report.add(
                        ValidationIssue::new(
                            Severity::Error,
                            "leaf_count is not the sum of the children's",
                        )
                        .with_cluster(node.id())
                        .with_context(format!(
                            "found {}, children sum to {}",
                            node.leaf_count(),
                            expected
                        )),
                    );
                }
            }
        }
    }

    if leaves != root.leaf_count() {
        report.add(
            ValidationIssue::new(Severity::Critical, "flattened leaves disagree with leaf_count")
                .with_cluster(root.id())
                .with_context(format!("{} leaves, leaf_count {}", leaves, root.leaf_count())),
        );
    }
    if internal + 1 != leaves {
        report.critical(format!(
            "{internal} internal clusters for {leaves} leaves, expected {}",
            leaves.saturating_sub(1)
        ));
    }

    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used, unused_results)]
mod tests {
    use super::*;
    use crate::cluster::Upgma;

    fn abs(a: &i32, b: &i32) -> f64 {
        f64::from((a - b).abs())
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_validation_report_healthy() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::new(Severity::Warning, "height is NaN"));
        assert!(report.is_healthy());
        assert!(!report.is_clean());

        report.critical("duplicate cluster id");
        assert!(!report.is_healthy());
        assert_eq!(report.counts().get(&Severity::Critical), Some(&1));
        assert!(report.to_string().contains("1 critical, 1 warnings"));
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue::new(Severity::Error, "Something wrong")
            .with_cluster(42)
            .with_context("additional info");

        let s = format!("{}", issue);
        assert!(s.contains("ERROR"));
        assert!(s.contains("Something wrong"));
        assert!(s.contains("cluster 42"));
        assert!(s.contains("additional info"));
    }

    #[test]
    fn test_built_tree_is_clean() {
        let tree = Upgma::new()
            .build(vec![0, 2, 3, 9, 14, 15, 40], abs)
            .unwrap();
        let report = tree.health_check();
        assert!(report.validation.is_clean(), "{}", report);
        assert_eq!(report.cluster_count, 13);
        assert_eq!(report.leaf_count, 7);
    }

    #[test]
    fn test_single_leaf_tree_is_healthy() {
        let tree = Upgma::new().build(vec![5], abs).unwrap();
        let report = tree.health_check();
        assert!(report.is_healthy(), "{}", report);
        assert_eq!(report.max_depth, 0);
        assert_eq!(report.max_height, 0.0);
    }

    #[test]
    fn test_duplicate_id_and_negative_height_are_reported() {
        let inner = Cluster::merged(2, Cluster::leaf(0, 1), Cluster::leaf(1, 2), 0.5);
        let bad = Cluster::merged(1, inner, Cluster::leaf(3, 3), -1.0);

        let report = validate_cluster(&bad);
        assert!(!report.is_healthy());
        assert!(report
            .issues
            .iter()
            .any(|i| i.message.contains("duplicate cluster id")));
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.cluster_id == Some(1)));
    }
}
