// src/services/auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthUser, Claims, LoginResponse, UsuarioResponse},
};

/// Validade do token emitido no login.
const TOKEN_TTL_DAYS: i64 = 1;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    pub async fn login(&self, cpf_digits: &str, senha: &str) -> Result<LoginResponse, AppError> {
        let usuario = self
            .user_repo
            .find_by_cpf(cpf_digits)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let senha_clone = senha.to_owned();
        let hash_clone = usuario.senha_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&senha_clone, &hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::info!("Senha incorreta para o usuário {}", usuario.id);
            return Err(AppError::WrongPassword);
        }

        let clientes = self.user_repo.list_cliente_ids(usuario.id).await?;
        let token = self.create_token(usuario.id, &usuario.cpf, clientes.clone())?;
        tracing::info!("🔑 Login do usuário {} ({} clientes)", usuario.id, clientes.len());

        Ok(LoginResponse {
            token,
            usuario: UsuarioResponse::from_usuario(usuario, clientes),
        })
    }

    /// Decodifica o token; o token é a única fonte do estado de autorização.
    pub fn validate_token(&self, token: &str) -> Result<AuthUser, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        })?;

        Ok(AuthUser::from(token_data.claims))
    }

    pub fn create_token(&self, user_id: i32, cpf: &str, clientes: Vec<i32>) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            cpf: cpf.to_string(),
            clientes,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub async fn get_usuario(&self, user: &AuthUser) -> Result<UsuarioResponse, AppError> {
        let usuario = self
            .user_repo
            .find_by_id(user.id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        // A lista de clientes vem do token, não do banco
        Ok(UsuarioResponse::from_usuario(usuario, user.clientes.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/matriculas_test")
            .unwrap();
        AuthService::new(UserRepository::new(pool), secret.to_string())
    }

    #[tokio::test]
    async fn token_round_trip_keeps_tenant_claims() {
        let auth = service("segredo");
        let token = auth.create_token(42, "12345678900", vec![3, 7]).unwrap();
        let user = auth.validate_token(&token).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.cpf, "12345678900");
        assert_eq!(user.clientes, vec![3, 7]);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_token() {
        let token = service("a").create_token(1, "1", vec![1]).unwrap();
        assert!(matches!(service("b").validate_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn garbage_is_invalid_token() {
        assert!(matches!(service("a").validate_token("abc.def"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let auth = service("segredo");
        let past = Utc::now() - chrono::Duration::days(2);
        let claims = Claims {
            sub: 1,
            cpf: "1".into(),
            clientes: vec![1],
            exp: past.timestamp() as usize,
            iat: (past - chrono::Duration::days(1)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"segredo")).unwrap();
        assert!(matches!(auth.validate_token(&token), Err(AppError::ExpiredToken)));
    }
}
