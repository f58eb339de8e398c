//! 交换机流表
//!
//! 最高优先级的匹配规则生效；同优先级时后装的规则优先。
//! 匹配条件与优先级都相同的规则会被替换而不是追加。

use std::net::Ipv4Addr;

use crate::ctrl::{FlowRule, FrameKind};

#[derive(Debug, Default, Clone)]
pub struct FlowTable {
    rules: Vec<FlowRule>,
}

impl FlowTable {
    pub fn install(&mut self, rule: FlowRule) {
        if let Some(slot) = self
            .rules
            .iter_mut()
            .find(|r| r.priority == rule.priority && r.matcher == rule.matcher)
        {
            *slot = rule;
        } else {
            self.rules.push(rule);
        }
    }

    // max_by_key 在相等时返回最后一个，即最新安装的规则
    pub fn lookup(&self, kind: FrameKind, dst: Option<Ipv4Addr>) -> Option<&FlowRule> {
        self.rules
            .iter()
            .filter(|r| r.matcher.matches(kind, dst))
            .max_by_key(|r| r.priority)
    }

    pub fn rules(&self) -> &[FlowRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
