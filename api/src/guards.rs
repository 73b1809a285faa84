//! Request guards resolving the acting user from headers set by the auth layer.

use judging_common::{Role, USER_ID_HEADER, USER_ROLE_HEADER, Viewer};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

/// Any authenticated user.
pub struct AuthenticatedUser(pub Viewer);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = &'static str;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();
        let user_id = headers
            .get_one(USER_ID_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let role = headers.get_one(USER_ROLE_HEADER).and_then(Role::from_header);

        match (user_id, role) {
            (Some(user_id), Some(role)) => Outcome::Success(AuthenticatedUser(Viewer {
                user_id: user_id.to_string(),
                role,
            })),
            _ => Outcome::Error((Status::Unauthorized, "missing or unknown identity")),
        }
    }
}

/// An authenticated user holding the judge role.
pub struct Judge(pub Viewer);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Judge {
    type Error = &'static str;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.guard::<AuthenticatedUser>().await {
            Outcome::Success(AuthenticatedUser(viewer)) if viewer.role == Role::Judge => {
                Outcome::Success(Judge(viewer))
            }
            Outcome::Success(_) => Outcome::Error((Status::Forbidden, "judges only")),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(s) => Outcome::Forward(s),
        }
    }
}
