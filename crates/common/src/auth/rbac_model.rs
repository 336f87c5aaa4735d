/// Casbin RBAC model with guards as domains
///
/// Request format: (user_id, guard_name, permission_name)
/// Policy format: (role_name, guard_name, permission_name)
/// Role assignment: (user_id, role_name, guard_name)
///
/// There is no wildcard or super-user shortcut: a role can only do what its
/// permission set lists, so "Super Admin" is granted the whole catalog explicitly.
pub const RBAC_MODEL: &str = r#"
[request_definition]
r = sub, dom, obj

[policy_definition]
p = sub, dom, obj

[role_definition]
g = _, _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub, r.dom) && r.dom == p.dom && r.obj == p.obj
"#;
