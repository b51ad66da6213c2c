use crate::{
    auth::{AuthService, TokenPair},
    entities::{
        password_reset_token,
        user::{self, UserRole},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{deliver, templates, Mailer},
    services::page_bounds,
    PaginatedResponse,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const MAX_FAILED_LOGINS: i32 = 5;
pub const LOCKOUT_MINUTES: i64 = 30;
pub const MIN_PASSWORD_LENGTH: usize = 8;
const USER_PAGE_SIZE: u64 = 20;
pub const RESET_TOKEN_MINUTES: i64 = 60;
const RESET_TOKEN_LENGTH: usize = 32;

/// At least eight characters with upper case, lower case and a digit.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let strong = password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit());
    if strong {
        Ok(())
    } else {
        let mut err = ValidationError::new("weak_password");
        err.message = Some(
            "Password must be at least 8 characters with an upper-case letter, a lower-case letter and a digit"
                .into(),
        );
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom = "validate_password_strength")]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone_number: String,
}

/// Username or email plus password
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    pub email_notifications: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(custom = "validate_password_strength")]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmPasswordResetRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(custom = "validate_password_strength")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: TokenPair,
    pub user: user::Model,
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ServiceError::HashError(e.to_string())
        })
}

/// Hex SHA-256 of a reset token, the only form that is persisted.
pub fn reset_token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn verify_password(hash: &str, password: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Registration, login, password recovery and profile management.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
    mailer: Arc<dyn Mailer>,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            event_sender,
            auth,
            mailer,
        }
    }

    async fn ensure_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        if let Some(username) = username {
            let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
            if let Some(id) = except {
                query = query.filter(user::Column::Id.ne(id));
            }
            if query.one(db).await?.is_some() {
                return Err(ServiceError::Conflict("Username is already taken".to_string()));
            }
        }
        if let Some(email) = email {
            let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
            if let Some(id) = except {
                query = query.filter(user::Column::Id.ne(id));
            }
            if query.one(db).await?.is_some() {
                return Err(ServiceError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Creates a regular user account with a hashed password.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - bad email, short username or weak password
    /// * [`ServiceError::Conflict`] - username or email already registered
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<user::Model, ServiceError> {
        self.register_with_role(request, UserRole::User).await
    }

    /// Used by seeding and tests to create staff accounts directly.
    pub async fn register_with_role(
        &self,
        request: RegisterRequest,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();
        self.ensure_unique(Some(&username), Some(&email), None)
            .await?;

        let now = Utc::now();
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(email),
            first_name: Set(request.first_name.trim().to_string()),
            last_name: Set(request.last_name.trim().to_string()),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(role),
            phone_number: Set(request.phone_number),
            email_notifications: Set(true),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_password_change: Set(Some(now)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::UserRegistered(account.id))
            .await;
        info!(user_id = %account.id, role = %account.role, "User registered");
        Ok(account)
    }

    /// Five consecutive failures lock the account for thirty minutes.
    ///
    /// # Arguments
    ///
    /// * `request` - username or email, matched against the lower-cased address
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] for unknown accounts and wrong passwords,
    /// [`ServiceError::AccountLocked`] with the unlock time while locked, and
    /// [`ServiceError::Forbidden`] for disabled accounts.
    #[instrument(skip(self, request), fields(login = %request.login))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db;
        let login = request.login.trim();
        let account = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login.to_lowercase())),
            )
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        let now = Utc::now();
        if let Some(until) = account.locked_until.filter(|until| *until > now) {
            warn!(user_id = %account.id, "Login attempt on locked account");
            return Err(ServiceError::AccountLocked(until.to_rfc3339()));
        }
        if !account.is_active {
            return Err(ServiceError::Forbidden("Account is disabled".to_string()));
        }

        if !verify_password(&account.password_hash, &request.password)? {
            let attempts = account.failed_login_attempts + 1;
            let user_id = account.id;
            let mut model: user::ActiveModel = account.into();
            if attempts >= MAX_FAILED_LOGINS {
                let until = now + Duration::minutes(LOCKOUT_MINUTES);
                model.failed_login_attempts = Set(0);
                model.locked_until = Set(Some(until));
                model.update(db).await?;
                self.event_sender
                    .send_or_log(Event::AccountLocked { user_id, until })
                    .await;
                return Err(ServiceError::AccountLocked(until.to_rfc3339()));
            }
            model.failed_login_attempts = Set(attempts);
            model.update(db).await?;
            warn!(user_id = %user_id, attempts, "Failed login");
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        let account = if account.failed_login_attempts != 0 || account.locked_until.is_some() {
            let mut model: user::ActiveModel = account.into();
            model.failed_login_attempts = Set(0);
            model.locked_until = Set(None);
            model.update(db).await?
        } else {
            account
        };

        let token = self
            .auth
            .generate_token(&account)
            .map_err(|e| ServiceError::JwtError(e.to_string()))?;
        info!(user_id = %account.id, "User logged in");
        Ok(LoginResponse {
            token,
            user: account,
        })
    }

    pub async fn get_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    /// Applies only the fields present in `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] when the new email belongs to another account.
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_user(id).await?;
        let email = request.email.map(|e| e.trim().to_lowercase());
        if let Some(email) = email.as_deref().filter(|e| *e != existing.email) {
            self.ensure_unique(None, Some(email), Some(id)).await?;
        }

        let mut model: user::ActiveModel = existing.into();
        if let Some(email) = email {
            model.email = Set(email);
        }
        if let Some(first_name) = request.first_name {
            model.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = request.last_name {
            model.last_name = Set(last_name.trim().to_string());
        }
        if let Some(phone_number) = request.phone_number {
            model.phone_number = Set(phone_number);
        }
        if let Some(flag) = request.email_notifications {
            model.email_notifications = Set(flag);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    /// # Errors
    ///
    /// * [`ServiceError::Unauthorized`] - `current_password` does not match
    /// * [`ServiceError::ValidationError`] - the new password is too weak
    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        let account = self.get_user(id).await?;
        if !verify_password(&account.password_hash, &request.current_password)? {
            warn!(user_id = %id, "Password change with wrong current password");
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let now = Utc::now();
        let mut model: user::ActiveModel = account.into();
        model.password_hash = Set(hash_password(&request.new_password)?);
        model.last_password_change = Set(Some(now));
        model.updated_at = Set(now);
        model.update(&*self.db).await?;
        info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// Emails a single-use reset token to the account registered under `email`.
    ///
    /// Unknown or disabled accounts get the same `Ok(())` as real ones, and a mail
    /// failure is only logged, so the response never reveals which addresses exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ValidationError`] for a malformed address and
    /// [`ServiceError::DatabaseError`] if the token cannot be stored.
    #[instrument(skip(self, request))]
    pub async fn request_password_reset(
        &self,
        request: PasswordResetRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        let Some(account) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
        else {
            info!("Password reset requested for an unknown address");
            return Ok(());
        };

        let token = generate_reset_token();
        let now = Utc::now();
        password_reset_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.id),
            token_hash: Set(reset_token_digest(&token)),
            expires_at: Set(now + Duration::minutes(RESET_TOKEN_MINUTES)),
            created_at: Set(now),
            used_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        let message = templates::password_reset(
            &account.email,
            &account.username,
            &token,
            RESET_TOKEN_MINUTES,
        );
        deliver(self.mailer.as_ref(), &message).await;
        self.event_sender
            .send_or_log(Event::PasswordResetRequested(account.id))
            .await;
        Ok(())
    }

    /// Sets a new password from a mailed reset token and clears any lockout.
    ///
    /// The token is consumed. Other outstanding tokens for the account stay valid
    /// until they expire.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::ValidationError`] - weak password
    /// * [`ServiceError::InvalidOperation`] - unknown, used or expired token
    #[instrument(skip(self, request))]
    pub async fn confirm_password_reset(
        &self,
        request: ConfirmPasswordResetRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let digest = reset_token_digest(request.token.trim());
        let txn = self.db.begin().await?;
        let grant = password_reset_token::Entity::find()
            .filter(password_reset_token::Column::TokenHash.eq(digest))
            .one(&txn)
            .await?
            .filter(|grant| grant.is_usable(now))
            .ok_or_else(|| {
                ServiceError::InvalidOperation("Reset token is invalid or has expired".to_string())
            })?;
        let account = user::Entity::find_by_id(grant.user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", grant.user_id))?;
        let user_id = account.id;

        let mut model: user::ActiveModel = account.into();
        model.password_hash = Set(hash_password(&request.new_password)?);
        model.last_password_change = Set(Some(now));
        model.failed_login_attempts = Set(0);
        model.locked_until = Set(None);
        model.updated_at = Set(now);
        model.update(&txn).await?;

        let mut grant: password_reset_token::ActiveModel = grant.into();
        grant.used_at = Set(Some(now));
        grant.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PasswordReset(user_id))
            .await;
        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    pub async fn list_users(
        &self,
        page: u64,
    ) -> Result<PaginatedResponse<user::Model>, ServiceError> {
        let (index, per_page) = page_bounds(page, USER_PAGE_SIZE);
        let paginator = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(index).await?;
        Ok(PaginatedResponse::new(items, total, index + 1, per_page))
    }

    /// # Arguments
    ///
    /// * `acting_admin` - the admin making the change
    /// * `id` - the account to change
    /// * `role` - the new role
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidOperation`] when an admin tries to demote themselves.
    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        acting_admin: Uuid,
        id: Uuid,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        if acting_admin == id && role != UserRole::Admin {
            return Err(ServiceError::InvalidOperation(
                "Admins cannot demote themselves".to_string(),
            ));
        }
        let account = self.get_user(id).await?;
        let mut model: user::ActiveModel = account.into();
        model.role = Set(role);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;
        info!(user_id = %id, role = %role, "User role changed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_strength_rules() {
        assert!(validate_password_strength("Factory123").is_ok());
        assert!(validate_password_strength("Fa1").is_err());
        assert!(validate_password_strength("factory123").is_err());
        assert!(validate_password_strength("FACTORY123").is_err());
        assert!(validate_password_strength("FactoryHub").is_err());
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("Factory123").unwrap();
        assert!(verify_password(&hash, "Factory123").unwrap());
        assert!(!verify_password(&hash, "Factory124").unwrap());
    }

    #[test]
    fn reset_tokens_are_random_and_stored_as_digests() {
        let first = generate_reset_token();
        let second = generate_reset_token();
        assert_eq!(first.len(), RESET_TOKEN_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);

        let digest = reset_token_digest(&first);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, reset_token_digest(&first));
        assert_ne!(digest, reset_token_digest(&second));
    }
}
