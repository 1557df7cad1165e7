//! Conformance suite for registered backends.
//!
//! The suite is parameterized over schemes. For every scheme it runs each
//! [`Case`] in a fresh working directory and compares returned status codes with
//! the documented ones. `UNIMPLEMENTED` always satisfies an expectation: a
//! backend may decline any capability. Any other mismatch fails the case.
//!
//! A case whose setup step fails (the working directory cannot be created, or
//! an operation needed to reach the asserted state is unsupported) is skipped.

mod cases;

use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::thread;

pub use cases::{CASES, Case};

use crate::core::status::Code;
use crate::core::{Result, utils};
use crate::env::Env;

static SEED: OnceLock<u32> = OnceLock::new();

/// Process-wide isolation seed, generated on first use.
///
/// [`Suite::run`] reads it before spawning any case, so every case observes the
/// same value.
pub fn seed() -> u32 {
    *SEED.get_or_init(rand::random)
}

/// The compliance rule: `actual` matches if it is `expected` or `UNIMPLEMENTED`.
pub fn unimplemented_or_returns(actual: Code, expected: Code) -> bool {
    actual == Code::Unimplemented || actual == expected
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Skipped(String),
    Failed(Vec<String>),
}

impl Outcome {
    pub fn skipped(reason: impl Into<String>) -> Outcome {
        Outcome::Skipped(reason.into())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Collects expectation failures of one case.
#[derive(Default)]
pub struct Checker {
    failures: Vec<String>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects `result` to carry `expected` or `UNIMPLEMENTED`.
    pub fn expect_code<T>(&mut self, what: &str, result: &Result<T>, expected: Code) {
        let actual = Code::of(result);
        if !unimplemented_or_returns(actual, expected) {
            let detail = match result {
                Err(status) => format!(" ({})", status.message()),
                Ok(_) => String::new(),
            };
            self.failures.push(format!(
                "{}: expected {} or {}, got {}{}",
                what,
                expected,
                Code::Unimplemented,
                actual,
                detail
            ));
        }
    }

    pub fn expect_eq(&mut self, what: &str, actual: &str, expected: &str) {
        if actual != expected {
            self.failures
                .push(format!("{}: expected {:?}, got {:?}", what, expected, actual));
        }
    }

    pub fn finish(self) -> Outcome {
        if self.failures.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed(self.failures)
        }
    }
}

/// Per-case state: the scheme under test and a unique working directory.
pub struct Fixture<'a> {
    env: &'a Env,
    scheme: &'a str,
    root_dir: String,
}

impl<'a> Fixture<'a> {
    /// `test_name` may contain `/`; it is flattened into one path segment.
    pub fn new(env: &'a Env, scheme: &'a str, temp_root: &str, test_name: &str) -> Self {
        let dir_name = format!("vfs_fs_{}_{}", seed(), test_name.replace('/', "_"));
        Self {
            env,
            scheme,
            root_dir: utils::join_path(temp_root, &dir_name),
        }
    }

    pub fn env(&self) -> &'a Env {
        self.env
    }

    pub fn scheme(&self) -> &str {
        self.scheme
    }

    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    /// Creates the working directory along with any missing ancestors.
    pub fn set_up(&self) -> Result<()> {
        self.env.recursively_create_dir(&self.uri_for(""))
    }

    /// URI of `path` below the working directory, qualified with the scheme
    /// unless the scheme is empty.
    pub fn uri_for(&self, path: &str) -> String {
        let translated = utils::join_path(&self.root_dir, path);
        if self.scheme.is_empty() {
            translated
        } else {
            format!("{}://{}", self.scheme, translated)
        }
    }

    /// Strips the working directory from an absolute path.
    pub fn relative_path<'p>(&self, absolute_path: &'p str) -> &'p str {
        absolute_path
            .strip_prefix(self.root_dir.as_str())
            .unwrap_or(absolute_path)
    }
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub scheme: String,
    pub case: &'static str,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct Report {
    pub cases: Vec<CaseReport>,
}

impl Report {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| *o == Outcome::Passed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Finds the outcome of `case` for `scheme`.
    pub fn outcome(&self, scheme: &str, case: &str) -> Option<&Outcome> {
        self.cases
            .iter()
            .find(|c| c.scheme == scheme && c.case == case)
            .map(|c| &c.outcome)
    }
}

fn display_scheme(scheme: &str) -> &str {
    if scheme.is_empty() { "<local>" } else { scheme }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.cases {
            let scheme = display_scheme(&report.scheme);
            match &report.outcome {
                Outcome::Passed => writeln!(f, "[  PASSED ] {} {}", scheme, report.case)?,
                Outcome::Skipped(reason) => {
                    writeln!(f, "[ SKIPPED ] {} {}: {}", scheme, report.case, reason)?
                }
                Outcome::Failed(failures) => {
                    writeln!(f, "[  FAILED ] {} {}", scheme, report.case)?;
                    for failure in failures {
                        writeln!(f, "             {}", failure)?;
                    }
                }
            }
        }
        write!(
            f,
            "{} passed, {} skipped, {} failed",
            self.passed(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Picks the schemes to test.
///
/// Requested schemes that are not registered are dropped with a warning. With
/// no request, every registered scheme is tested.
pub fn select_schemes(requested: &[String], registered: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return registered.to_vec();
    }
    let mut seen = BTreeSet::new();
    requested
        .iter()
        .filter(|scheme| {
            if !registered.contains(scheme) {
                log::warn!(
                    "scheme '{}' is not registered, not testing it",
                    display_scheme(scheme)
                );
                return false;
            }
            seen.insert(scheme.as_str())
        })
        .cloned()
        .collect()
}

/// A relative root would read as the host part of a scheme URI, so it is made
/// absolute against the process working directory.
fn absolute_temp_root(temp_root: &str) -> String {
    utils::absolute(temp_root).unwrap_or_else(|e| {
        log::warn!("cannot resolve {} against the working directory: {}", temp_root, e);
        utils::normalize(&utils::join_path("/", temp_root))
    })
}

pub struct Suite<'a> {
    env: &'a Env,
    schemes: Vec<String>,
    temp_root: String,
}

impl<'a> Suite<'a> {
    /// `temp_root` is the directory, in every tested backend's namespace, under
    /// which working directories are created. A relative `temp_root` is taken
    /// relative to the process working directory.
    pub fn new(env: &'a Env, schemes: Vec<String>, temp_root: &str) -> Self {
        Self {
            env,
            schemes,
            temp_root: absolute_temp_root(temp_root),
        }
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// Runs every case for every scheme. Schemes run in parallel.
    pub fn run(&self) -> Report {
        let seed = seed();
        log::info!(
            "running {} cases for {} schemes (seed {})",
            CASES.len(),
            self.schemes.len(),
            seed
        );

        let cases = thread::scope(|scope| {
            let handles: Vec<_> = self
                .schemes
                .iter()
                .enumerate()
                .map(|(index, scheme)| {
                    scope.spawn(move || {
                        CASES
                            .iter()
                            .map(|case| self.run_case(index, scheme, case))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(reports) => reports,
                    Err(_) => {
                        log::error!("a scheme worker panicked outside of a case");
                        Vec::new()
                    }
                })
                .collect()
        });

        Report { cases }
    }

    /// Runs one case. `index` is the scheme's position and disambiguates the
    /// working directory between schemes.
    pub fn run_case(&self, index: usize, scheme: &str, case: &Case) -> CaseReport {
        let test_name = format!("{}/{}", case.name, index);
        let fixture = Fixture::new(self.env, scheme, &self.temp_root, &test_name);

        let outcome = match fixture.set_up() {
            Err(status) => Outcome::skipped(format!("Cannot create working directory: {}", status)),
            Ok(()) => panic::catch_unwind(AssertUnwindSafe(|| (case.run)(&fixture)))
                .unwrap_or_else(|_| Outcome::Failed(vec![String::from("case panicked")])),
        };

        match &outcome {
            Outcome::Passed => log::info!("{} {}: passed", display_scheme(scheme), case.name),
            Outcome::Skipped(reason) => {
                log::info!("{} {}: skipped ({})", display_scheme(scheme), case.name, reason)
            }
            Outcome::Failed(failures) => {
                log::warn!("{} {}: failed {:?}", display_scheme(scheme), case.name, failures)
            }
        }

        CaseReport {
            scheme: scheme.to_string(),
            case: case.name,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::Status;
    use crate::{MapFS, SchemeRegistry};
    use std::sync::Arc;

    fn mem_env() -> Env {
        let mut registry = SchemeRegistry::new();
        registry.register("mem", Arc::new(MapFS::new())).unwrap();
        Env::new(registry)
    }

    #[test]
    fn test_unimplemented_or_returns() {
        assert!(unimplemented_or_returns(Code::Ok, Code::Ok));
        assert!(unimplemented_or_returns(Code::Unimplemented, Code::Ok));
        assert!(unimplemented_or_returns(Code::Unimplemented, Code::NotFound));
        assert!(!unimplemented_or_returns(Code::NotFound, Code::Ok));
        assert!(!unimplemented_or_returns(Code::Unknown, Code::NotFound));
        assert!(!unimplemented_or_returns(Code::Ok, Code::AlreadyExists));
    }

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(seed(), seed());
    }

    #[test]
    fn test_checker() {
        let mut check = Checker::new();
        check.expect_code::<()>("ok", &Ok(()), Code::Ok);
        check.expect_code::<()>("unimpl", &Err(Status::unimplemented("x")), Code::NotFound);
        assert_eq!(check.finish(), Outcome::Passed);

        let mut check = Checker::new();
        check.expect_code::<()>("create", &Ok(()), Code::AlreadyExists);
        check.expect_eq("name", "/a", "/b");
        match check.finish() {
            Outcome::Failed(failures) => {
                assert_eq!(failures.len(), 2);
                assert!(failures[0].contains("expected ALREADY_EXISTS or UNIMPLEMENTED, got OK"));
            }
            outcome => panic!("unexpected {:?}", outcome),
        }
    }

    mod fixture {
        use super::*;

        #[test]
        fn test_root_dir_is_unique_per_name() {
            let env = mem_env();
            let a = Fixture::new(&env, "mem", "/tmp", "create_file/0");
            let b = Fixture::new(&env, "mem", "/tmp", "create_file/1");
            assert_ne!(a.root_dir(), b.root_dir());
            assert_eq!(
                a.root_dir(),
                format!("/tmp/vfs_fs_{}_create_file_0", seed())
            );
        }

        #[test]
        fn test_uri_for() {
            let env = mem_env();
            let fx = Fixture::new(&env, "mem", "/tmp", "t");
            let root = fx.root_dir().to_string();
            assert_eq!(fx.uri_for("a_file"), format!("mem://{}/a_file", root));

            let local = Fixture::new(&env, "", "/tmp", "t");
            assert_eq!(local.uri_for("a_file"), format!("{}/a_file", root));
        }

        #[test]
        fn test_relative_path() {
            let env = mem_env();
            let fx = Fixture::new(&env, "mem", "/tmp", "t");
            let absolute = format!("{}/a_dir/a_file", fx.root_dir());
            assert_eq!(fx.relative_path(&absolute), "/a_dir/a_file");
            assert_eq!(fx.relative_path("/elsewhere"), "/elsewhere");
        }

        #[test]
        fn test_set_up_creates_root() {
            let env = mem_env();
            let fx = Fixture::new(&env, "mem", "/tmp/nested", "t");
            fx.set_up().unwrap();
            assert_eq!(Code::of(&env.is_directory(&fx.uri_for(""))), Code::Ok);
        }

        #[test]
        fn test_set_up_fails_for_unregistered_scheme() {
            let env = mem_env();
            let fx = Fixture::new(&env, "gs", "/tmp", "t");
            assert_eq!(Code::of(&fx.set_up()), Code::NotFound);
        }
    }

    mod selection {
        use super::*;

        fn strings(values: &[&str]) -> Vec<String> {
            values.iter().map(|s| s.to_string()).collect()
        }

        #[test]
        fn test_no_request_selects_all() {
            let registered = strings(&["", "file", "mem"]);
            assert_eq!(select_schemes(&[], &registered), registered);
        }

        #[test]
        fn test_request_is_filtered() {
            let registered = strings(&["", "file", "mem"]);
            let requested = strings(&["mem", "gs", "", "mem"]);
            assert_eq!(
                select_schemes(&requested, &registered),
                strings(&["mem", ""])
            );
        }

        #[test]
        fn test_nothing_registered() {
            assert!(select_schemes(&[], &[]).is_empty());
            assert!(select_schemes(&strings(&["mem"]), &[]).is_empty());
        }
    }

    mod suite {
        use super::*;

        #[test]
        fn test_relative_temp_root_is_resolved() {
            let env = mem_env();
            let suite = Suite::new(&env, vec!["mem".into()], "rel_tmp");
            let cwd = std::env::current_dir().unwrap();
            assert_eq!(
                suite.temp_root,
                utils::normalize(&format!("{}/rel_tmp", cwd.to_string_lossy()))
            );

            let report = suite.run();
            assert!(report.is_success(), "{}", report);
            assert_eq!(report.outcome("mem", "translate_name"), Some(&Outcome::Passed));
        }

        #[test]
        fn test_absolute_temp_root_is_normalized() {
            let env = mem_env();
            let suite = Suite::new(&env, vec!["mem".into()], "/tmp//x/./");
            assert_eq!(suite.temp_root, "/tmp/x");
        }
    }

    mod report {
        use super::*;

        #[test]
        fn test_counts_and_display() {
            let report = Report {
                cases: vec![
                    CaseReport {
                        scheme: String::new(),
                        case: "create_file",
                        outcome: Outcome::Passed,
                    },
                    CaseReport {
                        scheme: "mem".into(),
                        case: "create_dir",
                        outcome: Outcome::skipped("create_dir() not supported"),
                    },
                    CaseReport {
                        scheme: "mem".into(),
                        case: "read_file",
                        outcome: Outcome::Failed(vec!["boom".into()]),
                    },
                ],
            };
            assert_eq!(report.passed(), 1);
            assert_eq!(report.skipped(), 1);
            assert_eq!(report.failed(), 1);
            assert!(!report.is_success());
            assert_eq!(report.outcome("", "create_file"), Some(&Outcome::Passed));

            let text = report.to_string();
            assert!(text.contains("[  PASSED ] <local> create_file"));
            assert!(text.contains("[  FAILED ] mem read_file"));
            assert!(text.ends_with("1 passed, 1 skipped, 1 failed"));
        }
    }
}
