//! Canonicalization of program output before comparison.
//!
//! Line endings are unified, trailing whitespace is stripped from every line
//! and trailing blank lines are dropped. With a numeric tolerance configured,
//! lines are compared token by token and numeric tokens may differ by at most
//! the tolerance (absolute or relative, whichever is looser).

/// Compares actual against expected output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputNormalizer {
    float_tolerance: Option<f64>,
}

impl OutputNormalizer {
    pub fn new(float_tolerance: Option<f64>) -> Self {
        Self {
            float_tolerance: float_tolerance.filter(|t| t.is_finite() && *t >= 0.0),
        }
    }

    /// Canonical line list of `text`.
    pub fn normalize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut lines: Vec<&str> = text
            .split('\n')
            .map(|l| l.trim_end_matches('\r').trim_end())
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }

    pub fn matches(&self, actual: &str, expected: &str) -> bool {
        let actual = self.normalize(actual);
        let expected = self.normalize(expected);
        if actual.len() != expected.len() {
            return false;
        }
        match self.float_tolerance {
            None => actual == expected,
            Some(tolerance) => actual
                .iter()
                .zip(expected.iter())
                .all(|(a, e)| lines_match_with_tolerance(a, e, tolerance)),
        }
    }
}

fn lines_match_with_tolerance(actual: &str, expected: &str, tolerance: f64) -> bool {
    let mut actual_tokens = actual.split_whitespace();
    let mut expected_tokens = expected.split_whitespace();
    loop {
        match (actual_tokens.next(), expected_tokens.next()) {
            (None, None) => return true,
            (Some(a), Some(e)) => {
                if !tokens_match(a, e, tolerance) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

fn tokens_match(actual: &str, expected: &str, tolerance: f64) -> bool {
    if actual == expected {
        return true;
    }
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(e)) if a.is_finite() && e.is_finite() => {
            let diff = (a - e).abs();
            diff <= tolerance || diff <= tolerance * e.abs()
        }
        _ => false,
    }
}
