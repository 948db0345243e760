//! Authentication and account-lockout module
//!
//! Components:
//! - Access token generation and validation (JWT)
//! - Password hashing with Argon2
//! - Reset-token issuance and verification
//! - Pure lockout policy
//! - Middleware for request authentication
//! - The auth service orchestrating the above

pub mod jwt;
pub mod lockout;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

pub use jwt::{generate_access_token, validate_access_token, Claims, JwtConfig};
pub use lockout::{FailureTransition, LockoutPolicy};
pub use middleware::{auth_middleware, AuthError, AuthenticatedAccount};
pub use models::{
    AccountInfo, ForgotPasswordRequest, LoginData, LoginRequest, NotificationView,
    ResetPasswordRequest, SignupRequest, UnlockAccountRequest,
};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use service::AuthService;
