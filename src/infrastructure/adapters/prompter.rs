//! 대화형 입력 포트 구현 어댑터.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::application::ports::UserPrompter;

/// stdin에서 한 줄씩 답을 읽는 어댑터. EOF면 `None`을 돌려준다.
pub struct StdinPrompter;

impl UserPrompter for StdinPrompter {
    fn ask(&self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }
}
