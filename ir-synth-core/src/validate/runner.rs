//! Out-of-process candidate execution
//!
//! The candidate is untrusted generated code, so it never runs inside this
//! process. `PythonRunner` starts the interpreter with a static harness,
//! feeds it a JSON payload on stdin and reads one JSON line per case.

use super::oracle::TestCase;
use crate::errors::RunnerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Harness executed with `python -c`
const HARNESS: &str = r#"
import ast, json, signal, sys

out = sys.stdout
sys.stdout = sys.stderr

class CaseTimeout(BaseException):
    pass

armed = [False]

def on_alarm(signum, frame):
    if armed[0]:
        raise CaseTimeout()

def arm(seconds):
    if alarm:
        armed[0] = True
        signal.setitimer(signal.ITIMER_REAL, seconds, seconds)

def disarm():
    armed[0] = False
    if alarm:
        signal.setitimer(signal.ITIMER_REAL, 0)

def same(a, b):
    if isinstance(a, bool) or isinstance(b, bool):
        return type(a) is type(b) and a == b
    if isinstance(a, (list, tuple)) and isinstance(b, (list, tuple)):
        return type(a) is type(b) and len(a) == len(b) and all(same(x, y) for x, y in zip(a, b))
    if isinstance(a, dict) and isinstance(b, dict):
        return a.keys() == b.keys() and all(same(a[k], b[k]) for k in a)
    try:
        return bool(a == b)
    except Exception:
        return False

def emit(index, passed, actual):
    out.write(json.dumps({"index": index, "passed": passed, "actual": actual}) + "\n")
    out.flush()

def fail_all(message):
    for index in range(len(payload["cases"])):
        emit(index, False, message)
    sys.exit(0)

payload = json.loads(sys.stdin.read())
namespace = {"__name__": "candidate"}
try:
    exec(compile(payload["source"], "<candidate>", "exec"), namespace)
except BaseException as exc:
    fail_all("load error: %s: %s" % (type(exc).__name__, exc))

fn = namespace.get(payload["function"])
if not callable(fn):
    fail_all("%s is not callable" % payload["function"])

timeout = payload["case_timeout"]
alarm = hasattr(signal, "setitimer")
if alarm:
    signal.signal(signal.SIGALRM, on_alarm)

for index, case in enumerate(payload["cases"]):
    try:
        args = [ast.literal_eval(a) for a in case["inputs"]]
        expected = ast.literal_eval(case["expected"])
    except Exception as exc:
        emit(index, False, "invalid case literal: %s" % exc)
        continue
    arm(timeout)
    try:
        result = fn(*args)
        disarm()
    except CaseTimeout:
        disarm()
        emit(index, False, "timed out after %ss" % timeout)
        continue
    except BaseException as exc:
        disarm()
        emit(index, False, "%s: %s" % (type(exc).__name__, exc))
        continue
    try:
        emit(index, same(result, expected), repr(result))
    except Exception as exc:
        emit(index, False, "unrepresentable result: %s" % exc)
"#;

/// Result of one executed case
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaseOutcome {
    pub index: usize,
    pub passed: bool,
    /// `repr` of the returned value, or the error
    pub actual: String,
}

#[async_trait]
pub trait CandidateRunner: Send + Sync {
    /// Execute `function` from `source` against every case
    async fn run(
        &self,
        source: &str,
        function: &str,
        cases: &[TestCase],
    ) -> Result<Vec<CaseOutcome>, RunnerError>;
}

#[derive(Serialize)]
struct Payload<'a> {
    source: &'a str,
    function: &'a str,
    cases: &'a [TestCase],
    case_timeout: f64,
}

/// Runs candidates with a Python interpreter subprocess
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: String,
    case_timeout: Duration,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>, case_timeout: Duration) -> Self {
        Self { interpreter: interpreter.into(), case_timeout }
    }

    /// Wall-clock budget for the whole process: every case plus startup
    fn process_timeout(&self, cases: usize) -> Duration {
        self.case_timeout * (cases as u32 + 1) + Duration::from_secs(5)
    }
}

#[async_trait]
impl CandidateRunner for PythonRunner {
    async fn run(
        &self,
        source: &str,
        function: &str,
        cases: &[TestCase],
    ) -> Result<Vec<CaseOutcome>, RunnerError> {
        let start = Instant::now();
        let payload = serde_json::to_vec(&Payload {
            source,
            function,
            cases,
            case_timeout: self.case_timeout.as_secs_f64(),
        })?;

        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(HARNESS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::InterpreterUnavailable {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        let duration = self.process_timeout(cases.len());
        let output = tokio::time::timeout(duration, child.wait_with_output())
            .await
            .map_err(|_| RunnerError::Timeout { duration })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let outcomes = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<CaseOutcome>)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Ran {} case(s) against {} in {}ms",
            outcomes.len(),
            function,
            start.elapsed().as_millis()
        );

        if outcomes.len() < cases.len() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().last().unwrap_or("no output").to_string();
            return Err(RunnerError::Harness {
                message: format!(
                    "{} of {} case(s) reported (exit {:?}): {}",
                    outcomes.len(),
                    cases.len(),
                    output.status.code(),
                    message
                ),
            });
        }

        Ok(outcomes)
    }
}

/// True when `interpreter --version` runs successfully
pub fn python_available(interpreter: &str) -> bool {
    std::process::Command::new(interpreter)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(inputs: &[&str], expected: &str) -> TestCase {
        TestCase {
            label: "case".to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            expected: expected.to_string(),
        }
    }

    fn runner() -> Option<PythonRunner> {
        if !python_available("python3") {
            eprintln!("python3 not available, skipping");
            return None;
        }
        Some(PythonRunner::new("python3", Duration::from_millis(500)))
    }

    #[tokio::test]
    async fn test_bool_is_not_int() {
        let Some(runner) = runner() else { return };
        let source = "def ident(x):\n    print('noise')\n    return x\n";
        let outcomes = runner
            .run(
                source,
                "ident",
                &[case(&["1"], "1"), case(&["True"], "1"), case(&["[1, True]"], "[1, True]")],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].passed);
        assert!(!outcomes[1].passed);
        assert_eq!(outcomes[1].actual, "True");
        assert!(outcomes[2].passed);
    }

    #[tokio::test]
    async fn test_exceptions_and_timeouts_are_case_failures() {
        let Some(runner) = runner() else { return };
        let source = "\
def risky(x):
    if x == 0:
        raise ValueError('zero')
    while x < 0:
        pass
    return x
";
        let outcomes = runner
            .run(source, "risky", &[case(&["0"], "0"), case(&["-1"], "-1"), case(&["3"], "3")])
            .await
            .unwrap();

        assert_eq!(outcomes[0].actual, "ValueError: zero");
        assert!(outcomes[1].actual.starts_with("timed out"));
        assert!(outcomes[2].passed);
    }

    #[tokio::test]
    async fn test_timeout_escapes_broad_except() {
        let Some(runner) = runner() else { return };
        let source = "\
def stubborn(x):
    while x < 0:
        try:
            sum(range(100000))
        except Exception:
            pass
    return x
";
        let started = Instant::now();
        let outcomes = runner
            .run(source, "stubborn", &[case(&["-1"], "-1"), case(&["2"], "2")])
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].actual.starts_with("timed out"));
        assert!(outcomes[1].passed);
        assert!(started.elapsed() < runner.process_timeout(2));
    }

    #[tokio::test]
    async fn test_load_error_fails_every_case() {
        let Some(runner) = runner() else { return };
        let source = "raise RuntimeError('boom')\n";
        let outcomes =
            runner.run(source, "f", &[case(&["1"], "1"), case(&["2"], "2")]).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.passed && o.actual.contains("RuntimeError")));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let runner =
            PythonRunner::new("definitely-not-a-python-binary", Duration::from_millis(100));
        let err = runner.run("", "f", &[case(&["1"], "1")]).await.unwrap_err();
        assert!(matches!(err, RunnerError::InterpreterUnavailable { .. }));
    }
}
