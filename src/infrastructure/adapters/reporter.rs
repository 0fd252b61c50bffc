//! 콘솔 리포터 포트 구현 어댑터.

use std::io::{self, IsTerminal};

use crate::application::ports::Reporter;

/// 콘솔 전용 리포터 어댑터.
pub struct ConsoleReporter {
    color: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    /// stdout이 TTY일 때만 상태 색상을 쓴다.
    pub fn new() -> Self {
        Self {
            color: io::stdout().is_terminal(),
        }
    }

    fn paint_scope(&self, scope: &str) -> String {
        if !self.color {
            return scope.to_string();
        }
        match scope {
            "Poll" | "PR" | "Execute" => format!("\x1b[33m{scope}\x1b[0m"),
            _ => format!("\x1b[36m{scope}\x1b[0m"),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, name: &str) {
        println!();
        println!("==================== {} ====================", name);
    }

    fn kv(&self, key: &str, value: &str) {
        println!("{}: {}", key, value);
    }

    fn status(&self, scope: &str, message: &str) {
        println!("[{}] {}", self.paint_scope(scope), message);
    }

    fn raw(&self, line: &str) {
        println!("{}", line);
    }
}
