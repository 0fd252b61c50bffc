//! plan 검토 메뉴의 상태 전이표. 입력 수집 방식(콘솔/테스트)과 분리되어 있다.

/// 메뉴 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    /// Approve / Revise / ask-Questions / Deny
    AwaitingDecision,
    /// 승인 이후 Execute / open-PR / eXit
    AwaitingFollowup,
}

/// 입력 하나에 대한 전이 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Revise,
    AskQuestions,
    Deny,
    Execute,
    OpenPr,
    Exit,
    Invalid,
}

impl MenuState {
    /// 상태별 안내 문구.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::AwaitingDecision => {
                "\nNext action: (A) Approve, (R) Revise, (Q) Ask clarifying questions, (D) Deny: "
            }
            Self::AwaitingFollowup => "Next action: (E) Execute, (P) PR, (X) Exit: ",
        }
    }

    /// 잘못된 입력에 대한 재입력 안내.
    pub fn invalid_hint(self) -> &'static str {
        match self {
            Self::AwaitingDecision => "Invalid choice. Please enter A, R, Q, or D.",
            Self::AwaitingFollowup => "Invalid choice. Please enter E, P, or X.",
        }
    }

    /// 상태 × 입력 → 전이.
    pub fn transition(self, input: &str) -> Transition {
        let choice = input.trim().to_ascii_lowercase();
        match (self, choice.as_str()) {
            (Self::AwaitingDecision, "a") => Transition::Approve,
            (Self::AwaitingDecision, "r") => Transition::Revise,
            (Self::AwaitingDecision, "q") => Transition::AskQuestions,
            (Self::AwaitingDecision, "d") => Transition::Deny,
            (Self::AwaitingFollowup, "e") => Transition::Execute,
            (Self::AwaitingFollowup, "p") => Transition::OpenPr,
            (Self::AwaitingFollowup, "x") => Transition::Exit,
            _ => Transition::Invalid,
        }
    }
}

impl Transition {
    /// 전이 후 머무를 상태. `None`이면 루프를 떠난다.
    /// Revise/AskQuestions는 원격 작업 후 다시 결정 상태로 돌아온다.
    pub fn next_state(self, from: MenuState) -> Option<MenuState> {
        match self {
            Self::Approve => Some(MenuState::AwaitingFollowup),
            Self::Revise | Self::AskQuestions => Some(MenuState::AwaitingDecision),
            Self::Invalid => Some(from),
            Self::Deny | Self::Execute | Self::OpenPr | Self::Exit => None,
        }
    }
}
