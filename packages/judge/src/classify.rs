//! Classification of one execution into a [`CaseVerdict`].
//!
//! Error text produced by compilers and runtimes is matched against explicit
//! per-language rules so that compile errors and out-of-memory crashes are
//! told apart from ordinary runtime errors in one place.

use common::CaseVerdict;
use common::execution::ExecutionResult;

use crate::normalize::OutputNormalizer;

/// What a chunk of stderr says about the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSignature {
    /// The code never started: compiler or parser rejected it.
    Compile,
    /// The runtime reported an allocation failure.
    OutOfMemory,
    /// Nothing recognizable.
    Unknown,
}

struct LanguageRules {
    /// Text that must also be present for a compile match, if any.
    compile_marker: Option<&'static str>,
    compile: &'static [&'static str],
    out_of_memory: &'static [&'static str],
}

const C_FAMILY: LanguageRules = LanguageRules {
    compile_marker: None,
    compile: &[": error:", "compilation terminated", "undefined reference to"],
    out_of_memory: &["std::bad_alloc", "Cannot allocate memory"],
};

const PYTHON: LanguageRules = LanguageRules {
    compile_marker: None,
    compile: &["SyntaxError:", "IndentationError:", "TabError:"],
    out_of_memory: &["MemoryError"],
};

const JAVA: LanguageRules = LanguageRules {
    compile_marker: Some(".java:"),
    compile: &["error:"],
    out_of_memory: &["java.lang.OutOfMemoryError"],
};

const JAVASCRIPT: LanguageRules = LanguageRules {
    compile_marker: None,
    compile: &["SyntaxError:"],
    out_of_memory: &["JavaScript heap out of memory"],
};

const RUST: LanguageRules = LanguageRules {
    compile_marker: None,
    compile: &["error[E", "error: aborting due to", "error: expected"],
    out_of_memory: &["memory allocation of"],
};

const UNKNOWN: LanguageRules = LanguageRules {
    compile_marker: None,
    compile: &[],
    out_of_memory: &[],
};

fn rules_for(language: &str) -> &'static LanguageRules {
    match language {
        "c" | "cpp" | "c++" => &C_FAMILY,
        "python" | "python3" => &PYTHON,
        "java" => &JAVA,
        "javascript" | "js" | "node" => &JAVASCRIPT,
        "rust" => &RUST,
        _ => &UNKNOWN,
    }
}

/// Match `stderr` against the rules of `language`.
pub fn detect_signature(language: &str, stderr: &str) -> ErrorSignature {
    let rules = rules_for(language);
    let compile_hit = rules.compile_marker.is_none_or(|m| stderr.contains(m))
        && rules.compile.iter().any(|p| stderr.contains(p));
    if compile_hit {
        return ErrorSignature::Compile;
    }
    if rules.out_of_memory.iter().any(|p| stderr.contains(p)) {
        return ErrorSignature::OutOfMemory;
    }
    ErrorSignature::Unknown
}

/// Turns raw execution results into per-case verdicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    normalizer: OutputNormalizer,
}

impl Classifier {
    pub fn new(normalizer: OutputNormalizer) -> Self {
        Self { normalizer }
    }

    /// Classify the execution of the case at 1-based `ordinal`.
    ///
    /// Compile errors are only reported for the first case and only when the
    /// program produced no output; elsewhere the same text is a runtime error.
    pub fn classify(
        &self,
        language: &str,
        result: &ExecutionResult,
        expected_output: &str,
        ordinal: usize,
    ) -> CaseVerdict {
        if result.timed_out {
            return CaseVerdict::TimeLimitExceeded;
        }
        if result.memory_exceeded {
            return CaseVerdict::MemoryLimitExceeded;
        }
        if result.exit_code != Some(0) {
            return match detect_signature(language, &result.stderr) {
                ErrorSignature::Compile if ordinal == 1 && result.stdout.trim().is_empty() => {
                    CaseVerdict::CompileError
                }
                ErrorSignature::OutOfMemory => CaseVerdict::MemoryLimitExceeded,
                _ => CaseVerdict::RuntimeError,
            };
        }
        if self.normalizer.matches(&result.stdout, expected_output) {
            CaseVerdict::Passed
        } else {
            CaseVerdict::WrongAnswer
        }
    }
}
