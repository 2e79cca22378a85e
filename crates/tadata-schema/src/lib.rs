//! OpenAPI document loading and the deployment wire schema for Tadata.
//!
//! This crate defines the schema layer: loading and shallow validation of
//! OpenAPI 3.x documents from mappings, JSON, YAML or files (`OpenApiSpec`),
//! and the request/response types exchanged with the deployment API
//! (`UpsertDeploymentRequest`, `DeploymentResponse`, `AuthConfig`).

pub mod deployment;
pub mod openapi;

pub use deployment::{
    ApiErrorBody, AuthConfig, Deployment, DeploymentResponse, ErrorCode, FieldError,
    UpsertDeploymentData, UpsertDeploymentRequest,
};
pub use openapi::{Info, OpenApiSpec, SpecFormat, SpecInvalidError};
