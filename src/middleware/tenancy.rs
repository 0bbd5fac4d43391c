// src/middleware/tenancy.rs

use crate::{common::error::AppError, models::auth::AuthUser};

/// Resolve o cliente pedido contra os clientes do token.
///
/// Sem `requested`, o usuário segue com todos os seus clientes. Com
/// `requested`, ele é restrito a esse cliente, desde que pertença à lista.
pub fn authorize_tenant(user: &AuthUser, requested: Option<i32>) -> Result<AuthUser, AppError> {
    if user.clientes.is_empty() {
        return Err(AppError::NoTenantAccess);
    }
    match requested {
        Some(id) if user.can_access(id) => Ok(user.narrowed_to(id)),
        Some(id) => Err(AppError::TenantForbidden(id)),
        None => Ok(user.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(clientes: Vec<i32>) -> AuthUser {
        AuthUser {
            id: 1,
            cpf: "00000000000".into(),
            clientes,
        }
    }

    #[test]
    fn requested_tenant_must_be_in_the_token() {
        assert!(matches!(
            authorize_tenant(&user(vec![1, 2]), Some(3)),
            Err(AppError::TenantForbidden(3))
        ));
    }

    #[test]
    fn allowed_tenant_narrows_the_scope() {
        let narrowed = authorize_tenant(&user(vec![1, 2]), Some(2)).unwrap();
        assert_eq!(narrowed.clientes, vec![2]);
    }

    #[test]
    fn no_request_keeps_every_tenant() {
        assert_eq!(authorize_tenant(&user(vec![1, 2]), None).unwrap().clientes, vec![1, 2]);
    }

    #[test]
    fn user_without_tenants_is_rejected() {
        assert!(matches!(authorize_tenant(&user(vec![]), None), Err(AppError::NoTenantAccess)));
    }
}
