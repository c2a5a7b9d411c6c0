//! 라우트별 접근 정책

/// 인증 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// 유효한 액세스 토큰 필수
    Required,
    /// 토큰이 있으면 검증, 없거나 무효여도 요청 진행
    Optional,
}

/// 역할 요구사항
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// 나열된 역할 중 하나 이상 (OR)
    AnyOf(Vec<String>),
    /// 나열된 역할 모두 (AND)
    AllOf(Vec<String>),
}

impl RoleRequirement {
    pub fn any_of(roles: &[&str]) -> Self {
        RoleRequirement::AnyOf(roles.iter().map(|r| r.to_string()).collect())
    }

    pub fn all_of(roles: &[&str]) -> Self {
        RoleRequirement::AllOf(roles.iter().map(|r| r.to_string()).collect())
    }

    /// 사용자 역할이 요구사항을 만족하는지 확인
    pub fn is_satisfied(&self, user_roles: &[String]) -> bool {
        match self {
            RoleRequirement::AnyOf(required) => required.iter().any(|role| user_roles.contains(role)),
            RoleRequirement::AllOf(required) => required.iter().all(|role| user_roles.contains(role)),
        }
    }
}
