use crate::error::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Principal {
	pub name: String,
	pub is_admin: bool,
}

/// Bearer-token auth against the users file.
///
/// The file holds one `is_admin:user:token` entry per line, `y` marking
/// admins. It is re-read on every request so entries can be added or
/// revoked without a restart.
#[async_trait]
impl FromRequestParts<AppState> for Principal {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let token = parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.ok_or(ApiError::Unauthorized)?;

		let users = tokio::fs::read_to_string(&state.config.users_file).await.map_err(|e| {
			tracing::error!(path = %state.config.users_file.display(), error = %e, "cannot read users file");
			ApiError::Unauthorized
		})?;

		lookup(&users, token).ok_or(ApiError::Unauthorized)
	}
}

fn lookup(users: &str, token: &str) -> Option<Principal> {
	for line in users.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let mut fields = line.splitn(3, ':');
		let (Some(admin_flag), Some(name), Some(entry_token)) = (fields.next(), fields.next(), fields.next()) else {
			continue;
		};

		if entry_token == token {
			return Some(Principal {
				name: name.to_string(),
				is_admin: admin_flag == "y",
			});
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::lookup;

	const USERS: &str = "# service accounts\ny:admin:admintoken\nn:alice:alicetoken\n\nmalformed-line\n";

	#[test]
	fn finds_admin_entries() {
		let principal = lookup(USERS, "admintoken").unwrap();
		assert_eq!(principal.name, "admin");
		assert!(principal.is_admin);
	}

	#[test]
	fn finds_regular_entries() {
		let principal = lookup(USERS, "alicetoken").unwrap();
		assert_eq!(principal.name, "alice");
		assert!(!principal.is_admin);
	}

	#[test]
	fn unknown_tokens_and_junk_lines_yield_nothing() {
		assert!(lookup(USERS, "bogus").is_none());
		assert!(lookup(USERS, "malformed-line").is_none());
		assert!(lookup(USERS, "").is_none());
	}
}
