// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OpenAPI description of the service account gate.
//!
//! Registration is an explicit call made while wiring the router: it adds an
//! OpenID Connect security scheme to the document (once) and requires it,
//! scoped to the configured service account, on the given paths.

use utoipa::openapi::{
    path::{Operation, PathItem},
    security::{OpenIdConnect, SecurityRequirement, SecurityScheme},
    OpenApi,
};

use super::gate::ServiceAccountGate;

/// Key of the security scheme in `components.securitySchemes`.
pub const SECURITY_SCHEME_KEY: &str = "gcloud_service_account";

/// Google's OpenID Connect discovery document.
pub const GOOGLE_OPENID_CONFIGURATION: &str =
    "https://accounts.google.com/.well-known/openid-configuration";

const SCHEME_DESCRIPTION: &str = "\
Requests must carry a Google-signed OpenID Connect identity token for the \
listed service account, as sent by Google Cloud services such as:
- Cloud Scheduler: https://cloud.google.com/scheduler/docs/http-target-auth
- Pub/Sub push: https://cloud.google.com/pubsub/docs/push#authentication
";

/// Register the security scheme and require it on every operation of `paths`.
///
/// Paths missing from the document are ignored. Calling this more than once
/// keeps a single scheme entry and one requirement per operation.
pub fn register_service_account(openapi: &mut OpenApi, service_account: &str, paths: &[&str]) {
    let components = openapi.components.get_or_insert_with(Default::default);
    if !components.security_schemes.contains_key(SECURITY_SCHEME_KEY) {
        components.add_security_scheme(
            SECURITY_SCHEME_KEY,
            SecurityScheme::OpenIdConnect(OpenIdConnect::with_description(
                GOOGLE_OPENID_CONFIGURATION,
                SCHEME_DESCRIPTION,
            )),
        );
    }

    for path in paths {
        let Some(item) = openapi.paths.paths.get_mut(*path) else {
            tracing::warn!(path, "cannot document gate on unknown path");
            continue;
        };

        let requirement = SecurityRequirement::new(SECURITY_SCHEME_KEY, [service_account]);
        for operation in operations_mut(item) {
            let security = operation.security.get_or_insert_with(Vec::new);
            if !security.contains(&requirement) {
                security.push(requirement.clone());
            }
        }
    }
}

fn operations_mut(item: &mut PathItem) -> impl Iterator<Item = &mut Operation> {
    [
        &mut item.get,
        &mut item.put,
        &mut item.post,
        &mut item.delete,
        &mut item.options,
        &mut item.head,
        &mut item.patch,
        &mut item.trace,
    ]
    .into_iter()
    .flatten()
}

impl<V> ServiceAccountGate<V>
where
    V: super::verifier::TokenVerifier,
{
    /// Describe this gate on `paths` of `openapi`.
    pub fn document(&self, openapi: &mut OpenApi, paths: &[&str]) {
        register_service_account(openapi, self.service_account(), paths);
    }
}
