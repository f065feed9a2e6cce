//! 链路生命周期状态

/// 外设链路状态
///
/// - `Unattached`：没有可用硬件（未发现 / 打开失败），链路继续排空通道，所有命令静默丢弃
/// - `Attached`：持有硬件句柄，由链路线程独占
///
/// 状态在启动时确定，之后不会自动重新打开。
#[derive(Debug)]
pub enum LinkState<H> {
    Unattached,
    Attached(H),
}

impl<H> LinkState<H> {
    pub fn is_attached(&self) -> bool {
        matches!(self, LinkState::Attached(_))
    }

    pub fn handle_mut(&mut self) -> Option<&mut H> {
        match self {
            LinkState::Attached(handle) => Some(handle),
            LinkState::Unattached => None,
        }
    }

    /// 状态名（日志用）
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Attached(_) => "attached",
            LinkState::Unattached => "unattached",
        }
    }
}

impl<H> From<Option<H>> for LinkState<H> {
    fn from(handle: Option<H>) -> Self {
        match handle {
            Some(handle) => LinkState::Attached(handle),
            None => LinkState::Unattached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_transitions() {
        let mut state: LinkState<u8> = None.into();
        assert!(!state.is_attached());
        assert!(state.handle_mut().is_none());
        assert_eq!(state.label(), "unattached");

        state = Some(7).into();
        assert!(state.is_attached());
        *state.handle_mut().unwrap() += 1;
        assert!(matches!(state, LinkState::Attached(8)));
    }
}
