//! User store: profile, password, role and permission management

use crate::core::api::ApiClient;
use crate::core::error::ClientResult;
use crate::core::transport::{ApiRequest, FileUpload, FormPart};
use crate::entities::{
    PasswordChange, PermissionAssignment, ROLE_ADMIN, ROLE_EMPLOYEE, RoleAssignment, User,
    UserFilter, UserPatch, UserProfileUpdate,
};
use crate::store::EntityStore;
use serde::Deserialize;
use std::ops::Deref;
use uuid::Uuid;
use validator::Validate;

const PROFILE_PATH: &str = "/api/users/me";
const ADMIN_USERS_PATH: &str = "/api/admin/users";

#[derive(Debug, Deserialize)]
struct UploadedFile {
    url: String,
}

/// Users store
///
/// Dereferences to the generic [`EntityStore<User>`] for plain CRUD.
#[derive(Debug)]
pub struct UserStore {
    store: EntityStore<User>,
}

impl Deref for UserStore {
    type Target = EntityStore<User>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl UserStore {
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self {
            store: EntityStore::new(api, page_size),
        }
    }

    pub fn store(&self) -> &EntityStore<User> {
        &self.store
    }

    /// Signed-in user's own record, into `current_item`
    pub async fn get_profile(&self) -> ClientResult<User> {
        self.store
            .tracked("get_profile", async {
                let user: User = self.api().single(ApiRequest::get(PROFILE_PATH)).await?;
                self.store.set_current_item(Some(user.clone()));
                Ok(user)
            })
            .await
    }

    pub async fn update_profile(&self, payload: &UserProfileUpdate) -> ClientResult<User> {
        self.store
            .tracked("update_profile", async {
                payload.validate()?;
                let request = ApiRequest::put(PROFILE_PATH).json(payload)?;
                let user: User = self.api().single(request).await?;
                self.store.set_current_item(Some(user.clone()));
                Ok(user)
            })
            .await
    }

    pub async fn change_password(&self, payload: &PasswordChange) -> ClientResult<()> {
        self.store
            .tracked("change_password", async {
                payload.validate()?;
                let request = ApiRequest::post(format!("{PROFILE_PATH}/change-password"))
                    .json(payload)?;
                self.api().send(request).await
            })
            .await
    }

    /// Replace a user's roles (admin only)
    pub async fn assign_roles(&self, payload: &RoleAssignment) -> ClientResult<User> {
        self.store
            .tracked("assign_roles", async {
                let request =
                    ApiRequest::post(format!("{ADMIN_USERS_PATH}/{}/roles", payload.user_id))
                        .json(payload)?;
                let user: User = self.api().single(request).await?;
                self.store.replace_item(payload.user_id, &user);
                Ok(user)
            })
            .await
    }

    /// Replace a user's permissions (admin only)
    pub async fn assign_permissions(&self, payload: &PermissionAssignment) -> ClientResult<User> {
        self.store
            .tracked("assign_permissions", async {
                let request = ApiRequest::post(format!(
                    "{ADMIN_USERS_PATH}/{}/permissions",
                    payload.user_id
                ))
                .json(payload)?;
                let user: User = self.api().single(request).await?;
                self.store.replace_item(payload.user_id, &user);
                Ok(user)
            })
            .await
    }

    /// Activate or deactivate an account (admin only)
    pub async fn toggle_user_status(&self, id: Uuid, is_active: bool) -> ClientResult<User> {
        let patch = UserPatch {
            is_active: Some(is_active),
            ..Default::default()
        };
        self.store.patch(id, &patch).await
    }

    pub async fn get_users_by_role(&self, role: &str) -> ClientResult<Vec<User>> {
        let filter = UserFilter {
            roles: Some(vec![role.to_string()]),
            ..Default::default()
        };
        self.store.get_all(Some(&filter)).await
    }

    pub async fn get_admins(&self) -> ClientResult<Vec<User>> {
        self.get_users_by_role(ROLE_ADMIN).await
    }

    pub async fn get_employees(&self) -> ClientResult<Vec<User>> {
        self.get_users_by_role(ROLE_EMPLOYEE).await
    }

    /// Users who drive and share their address, for car pooling
    pub async fn get_users_with_cars(&self) -> ClientResult<Vec<User>> {
        let filter = UserFilter {
            has_car: Some(true),
            show_address_public: Some(true),
            ..Default::default()
        };
        self.store.get_all(Some(&filter)).await
    }

    /// Search by name or email
    pub async fn search_users(&self, query: &str) -> ClientResult<Vec<User>> {
        let filter = UserFilter {
            search: Some(query.to_string()),
            ..Default::default()
        };
        self.store.get_all(Some(&filter)).await
    }

    /// Upload a new profile picture, returning its URL
    pub async fn upload_profile_picture(&self, file: FileUpload) -> ClientResult<String> {
        self.store
            .tracked("upload_profile_picture", async {
                let request = ApiRequest::post(format!("{PROFILE_PATH}/profile-picture"))
                    .multipart(vec![FormPart::file("file", file)]);
                let uploaded: UploadedFile = self.api().single(request).await?;
                Ok(uploaded.url)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{FormValue, RequestBody};
    use crate::test_support::ScriptedTransport;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn user_json(id: Uuid, roles: &[&str]) -> Value {
        json!({
            "id": id,
            "createdAt": "2024-02-01T08:00:00Z",
            "updatedAt": "2024-02-01T08:00:00Z",
            "email": "lee@staffdesk.io",
            "fullName": "Lee Park",
            "roles": roles,
            "isActive": true
        })
    }

    fn store() -> (Arc<ScriptedTransport>, UserStore) {
        let transport = ScriptedTransport::new();
        let store = UserStore::new(ApiClient::new(transport.clone()), 10);
        (transport, store)
    }

    #[tokio::test]
    async fn test_get_profile_sets_current_item() {
        let (transport, users) = store();
        let id = Uuid::new_v4();
        transport.respond_json(200, json!({"data": user_json(id, &["employee"]), "success": true}));

        let user = users.get_profile().await.unwrap();

        assert_eq!(transport.last_request().path, "/api/users/me");
        assert_eq!(users.current_item().map(|u| u.id), Some(user.id));
        assert!(users.items().is_empty());
    }

    #[tokio::test]
    async fn test_users_by_role_sends_array_filter() {
        let (transport, users) = store();
        transport.respond_json(
            200,
            json!({
                "data": [user_json(Uuid::new_v4(), &["admin"])],
                "total": 1,
                "page": 1,
                "pageSize": 10
            }),
        );

        let admins = users.get_admins().await.unwrap();

        assert_eq!(admins.len(), 1);
        let request = transport.last_request();
        assert_eq!(request.path, "/api/users");
        assert!(
            request
                .query
                .to_pairs()
                .contains(&("roles[]".to_string(), "admin".to_string()))
        );
    }

    #[tokio::test]
    async fn test_users_with_cars_filter() {
        let (transport, users) = store();
        transport.respond_json(200, json!({"data": [], "total": 0, "page": 1, "pageSize": 10}));

        users.get_users_with_cars().await.unwrap();

        let query = transport.last_request().query;
        assert_eq!(query.get("hasCar"), Some(&json!(true)));
        assert_eq!(query.get("showAddressPublic"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_assign_roles_replaces_cached_user() {
        let (transport, users) = store();
        let id = Uuid::new_v4();
        transport.respond_json(
            200,
            json!({"data": [user_json(id, &["employee"])], "total": 1, "page": 1, "pageSize": 10}),
        );
        users.get_all(None).await.unwrap();

        transport.respond_json(
            200,
            json!({"data": user_json(id, &["employee", "admin"]), "success": true}),
        );
        users
            .assign_roles(&RoleAssignment {
                user_id: id,
                roles: vec!["employee".to_string(), "admin".to_string()],
                granted_by: Uuid::new_v4(),
            })
            .await
            .unwrap();

        assert_eq!(transport.last_request().path, format!("/api/admin/users/{id}/roles"));
        assert!(users.items()[0].is_admin());
    }

    #[tokio::test]
    async fn test_toggle_user_status_patches_is_active() {
        let (transport, users) = store();
        let id = Uuid::new_v4();
        transport.respond_json(200, json!({"data": user_json(id, &[]), "success": true}));

        users.toggle_user_status(id, false).await.unwrap();

        let request = transport.last_request();
        assert_eq!(request.method, reqwest::Method::PATCH);
        assert_eq!(request.body, RequestBody::Json(json!({"isActive": false})));
    }

    #[tokio::test]
    async fn test_change_password_mismatch_is_local() {
        let (transport, users) = store();

        let result = users
            .change_password(&PasswordChange {
                current_password: "hunter22".to_string(),
                new_password: "correct horse".to_string(),
                confirm_password: "correct hose".to_string(),
            })
            .await;

        assert!(result.is_err());
        assert!(transport.requests().is_empty());
        assert!(users.has_error());
    }

    #[tokio::test]
    async fn test_upload_profile_picture_returns_url() {
        let (transport, users) = store();
        transport.respond_json(
            200,
            json!({"data": {"url": "https://cdn.staffdesk.io/p/lee.png"}, "success": true}),
        );

        let url = users
            .upload_profile_picture(
                FileUpload::new("lee.png", vec![1, 2, 3]).with_content_type("image/png"),
            )
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.staffdesk.io/p/lee.png");
        let RequestBody::Multipart(parts) = transport.last_request().body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "file");
        assert!(matches!(parts[0].value, FormValue::File(_)));
    }
}
