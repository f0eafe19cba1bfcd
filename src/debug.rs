use serde_json::Value;

/// Optional human-readable tracing of what a scenario does. Never changes
/// the outcome of a step.
pub trait Debugger: Send + Sync + std::fmt::Debug {
    fn print(&self, text: &str);

    fn is_on(&self) -> bool;

    fn turn_on(&mut self);

    fn turn_off(&mut self);

    fn reset(&mut self, initially_on: bool) {
        if initially_on {
            self.turn_on();
        } else {
            self.turn_off();
        }
    }
}

/// Writes to stdout while switched on.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDebugger {
    on: bool,
}

impl ConsoleDebugger {
    pub fn new(on: bool) -> Self {
        Self { on }
    }
}

impl Debugger for ConsoleDebugger {
    fn print(&self, text: &str) {
        if self.on {
            println!("{}", text);
        }
    }

    fn is_on(&self) -> bool {
        self.on
    }

    fn turn_on(&mut self) {
        self.on = true;
    }

    fn turn_off(&mut self) {
        self.on = false;
    }
}

/// Pretty-prints JSON bodies, falling back to the raw text.
pub fn pretty_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_and_resets() {
        let mut d = ConsoleDebugger::default();
        assert!(!d.is_on());
        d.turn_on();
        assert!(d.is_on());
        d.print("visible");
        d.reset(false);
        assert!(!d.is_on());
        d.reset(true);
        assert!(d.is_on());
    }

    #[test]
    fn pretty_body_formats_json_only() {
        assert_eq!(pretty_body(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(pretty_body("plain"), "plain");
    }
}
