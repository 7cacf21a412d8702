//! # HTTP Compute Client
//!
//! Production [`ComputeApi`] implementation over the provider's REST
//! surface. All URLs are `{base_url}projects/{project}/{scope}/{collection}/...`.
//!
//! | Method | Path (relative to project) | Operation |
//! |--------|----------------------------|-----------|
//! | GET    | `{scope}/operations/{op}` | Poll operation |
//! | GET/POST/DELETE | `zones/{z}/instances[/{name}]` | Instance CRUD |
//! | POST   | `zones/{z}/instances/{name}/{start,stop,attachDisk,detachDisk}` | Instance actions |
//! | GET/POST | `regions/{r}/addresses` | List / reserve addresses |
//! | GET    | `global/networks/{n}`, `regions/{r}/subnetworks/{s}` | Network lookups |
//! | GET/POST/DELETE | `{scope}/instanceGroups[/{name}]` | Instance groups |
//! | POST   | `zones/{z}/instanceGroups/{g}/{listInstances,addInstances}` | Group membership |
//! | GET/POST/DELETE | `{scope}/instanceGroupManagers[/{name}]` | Managers |
//! | POST   | `{scope}/instanceGroupManagers/{m}/setTargetPools` | Manager pools |
//! | GET/POST/DELETE | `{scope}/autoscalers[/{name}]` | Autoscalers |
//! | GET/POST/DELETE | `global/instanceTemplates[/{name}]` | Templates |
//! | GET/POST/DELETE/PATCH | `{scope}/backendServices[/{name}]` | Backend services |
//! | GET/POST/DELETE | `{scope}/forwardingRules[/{name}]` | Forwarding rules |
//! | GET/POST | `regions/{r}/targetPools/{p}[/{addInstance,removeInstance}]` | Target pools |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use vpcmig_core::Scope;

use crate::api::ComputeApi;
use crate::config::{ComputeApiConfig, ConfigError};
use crate::error::ComputeError;
use crate::operation::Operation;
use crate::retry::{send_with_backoff, Backoff};
use crate::resources::{
    AddressConfig, AttachedDisk, AutoscalerConfig, BackendServiceConfig, ForwardingRuleConfig,
    InstanceConfig, InstanceGroupConfig, InstanceGroupManagerConfig, InstanceTemplateConfig,
    ListResponse, NetworkConfig, SubnetworkConfig, TargetPoolConfig,
};

/// reqwest-backed compute client.
#[derive(Debug, Clone)]
pub struct HttpComputeClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct GroupMember {
    instance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedInstancesResponse {
    #[serde(default)]
    managed_instances: Vec<GroupMember>,
}

impl HttpComputeClient {
    /// Create a new client from configuration.
    pub fn new(config: &ComputeApiConfig) -> Result<Self, ComputeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!(
                        "Bearer {}",
                        config.access_token.as_str()
                    ))
                    .map_err(|_| ComputeError::Config(ConfigError::MissingToken))?,
                );
                headers
            })
            .build()
            .map_err(|e| ComputeError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ComputeError> {
        self.base_url
            .join(path)
            .map_err(|e| ComputeError::Config(ConfigError::InvalidUrl(path.to_string(), e.to_string())))
    }

    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ComputeError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let endpoint = format!("{method} {}", url.path());
        let idempotent = method == Method::GET;
        let resp = send_with_backoff(Backoff::default(), idempotent, || {
            let req = self.http.request(method.clone(), url.clone());
            let req = match body {
                Some(b) => req.json(b),
                None => req,
            };
            req.send()
        })
        .await
        .map_err(|e| ComputeError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ComputeError::NotFound { endpoint });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ComputeError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, ComputeError> {
        resp.json().await.map_err(|e| ComputeError::Deserialization {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ComputeError> {
        let url = self.url(path)?;
        let resp = self.send::<()>(Method::GET, url, None).await?;
        Self::decode(resp, path).await
    }

    /// Follows `nextPageToken` until exhausted.
    async fn list_json<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ComputeError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.url(path)?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let resp = self.send::<()>(Method::GET, url, None).await?;
            let page: ListResponse<T> = Self::decode(resp, path).await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(items),
            }
        }
    }

    async fn operation<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Operation, ComputeError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path)?;
        let resp = self.send(method, url, body).await?;
        Self::decode(resp, path).await
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Operation, ComputeError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.operation(Method::POST, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Operation, ComputeError> {
        self.operation::<()>(Method::DELETE, path, None).await
    }
}

fn project_path(project: &str, scope: &Scope, collection: &str) -> String {
    format!("projects/{project}/{}/{collection}", scope.path())
}

fn zone_path(project: &str, zone: &str, collection: &str) -> String {
    project_path(project, &Scope::Zone(zone.to_string()), collection)
}

fn region_path(project: &str, region: &str, collection: &str) -> String {
    project_path(project, &Scope::Region(region.to_string()), collection)
}

fn instance_refs(links: &[String]) -> serde_json::Value {
    json!({
        "instances": links.iter().map(|l| json!({"instance": l})).collect::<Vec<_>>()
    })
}

#[async_trait]
impl ComputeApi for HttpComputeClient {
    async fn get_operation(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.get_json(&format!("{}/{name}", project_path(project, scope, "operations")))
            .await
    }

    async fn get_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<InstanceConfig, ComputeError> {
        self.get_json(&format!("{}/{name}", zone_path(project, zone, "instances")))
            .await
    }

    async fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&zone_path(project, zone, "instances"), config).await
    }

    async fn delete_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!("{}/{name}", zone_path(project, zone, "instances")))
            .await
    }

    async fn start_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!("{}/{name}/start", zone_path(project, zone, "instances")),
            &json!({}),
        )
        .await
    }

    async fn stop_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!("{}/{name}/stop", zone_path(project, zone, "instances")),
            &json!({}),
        )
        .await
    }

    async fn attach_disk(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        disk: &AttachedDisk,
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!("{}/{instance}/attachDisk", zone_path(project, zone, "instances")),
            disk,
        )
        .await
    }

    async fn detach_disk(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        device_name: &str,
    ) -> Result<Operation, ComputeError> {
        let path = format!("{}/{instance}/detachDisk", zone_path(project, zone, "instances"));
        let mut url = self.url(&path)?;
        url.query_pairs_mut().append_pair("deviceName", device_name);
        let resp = self.send(Method::POST, url, Some(&json!({}))).await?;
        Self::decode(resp, &path).await
    }

    async fn list_addresses(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<AddressConfig>, ComputeError> {
        self.list_json(&region_path(project, region, "addresses")).await
    }

    async fn insert_address(
        &self,
        project: &str,
        region: &str,
        address: &AddressConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&region_path(project, region, "addresses"), address)
            .await
    }

    async fn get_network(&self, project: &str, name: &str) -> Result<NetworkConfig, ComputeError> {
        self.get_json(&format!(
            "{}/{name}",
            project_path(project, &Scope::Global, "networks")
        ))
        .await
    }

    async fn get_subnetwork(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<SubnetworkConfig, ComputeError> {
        self.get_json(&format!("{}/{name}", region_path(project, region, "subnetworks")))
            .await
    }

    async fn get_instance_group(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<InstanceGroupConfig, ComputeError> {
        self.get_json(&format!(
            "{}/{name}",
            project_path(project, scope, "instanceGroups")
        ))
        .await
    }

    async fn list_instance_groups(
        &self,
        project: &str,
        zone: &str,
    ) -> Result<Vec<InstanceGroupConfig>, ComputeError> {
        self.list_json(&zone_path(project, zone, "instanceGroups")).await
    }

    async fn list_group_instances(
        &self,
        project: &str,
        zone: &str,
        group: &str,
    ) -> Result<Vec<String>, ComputeError> {
        let path = format!(
            "{}/{group}/listInstances",
            zone_path(project, zone, "instanceGroups")
        );
        let url = self.url(&path)?;
        let resp = self
            .send(Method::POST, url, Some(&json!({"instanceState": "ALL"})))
            .await?;
        let page: ListResponse<GroupMember> = Self::decode(resp, &path).await?;
        Ok(page.items.into_iter().map(|m| m.instance).collect())
    }

    async fn insert_instance_group(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceGroupConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&zone_path(project, zone, "instanceGroups"), config)
            .await
    }

    async fn delete_instance_group(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!("{}/{name}", zone_path(project, zone, "instanceGroups")))
            .await
    }

    async fn add_instances_to_group(
        &self,
        project: &str,
        zone: &str,
        group: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!(
                "{}/{group}/addInstances",
                zone_path(project, zone, "instanceGroups")
            ),
            &instance_refs(instance_links),
        )
        .await
    }

    async fn get_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<InstanceGroupManagerConfig, ComputeError> {
        self.get_json(&format!(
            "{}/{name}",
            project_path(project, scope, "instanceGroupManagers")
        ))
        .await
    }

    async fn list_instance_group_managers(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<InstanceGroupManagerConfig>, ComputeError> {
        self.list_json(&project_path(project, scope, "instanceGroupManagers"))
            .await
    }

    async fn list_managed_instances(
        &self,
        project: &str,
        scope: &Scope,
        manager: &str,
    ) -> Result<Vec<String>, ComputeError> {
        let path = format!(
            "{}/{manager}/listManagedInstances",
            project_path(project, scope, "instanceGroupManagers")
        );
        let url = self.url(&path)?;
        let resp = self.send::<()>(Method::POST, url, None).await?;
        let page: ManagedInstancesResponse = Self::decode(resp, &path).await?;
        Ok(page.managed_instances.into_iter().map(|m| m.instance).collect())
    }

    async fn insert_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        config: &InstanceGroupManagerConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&project_path(project, scope, "instanceGroupManagers"), config)
            .await
    }

    async fn delete_instance_group_manager(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!(
            "{}/{name}",
            project_path(project, scope, "instanceGroupManagers")
        ))
        .await
    }

    async fn set_target_pools(
        &self,
        project: &str,
        scope: &Scope,
        manager: &str,
        target_pools: &[String],
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!(
                "{}/{manager}/setTargetPools",
                project_path(project, scope, "instanceGroupManagers")
            ),
            &json!({"targetPools": target_pools}),
        )
        .await
    }

    async fn list_autoscalers(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<AutoscalerConfig>, ComputeError> {
        self.list_json(&project_path(project, scope, "autoscalers"))
            .await
    }

    async fn insert_autoscaler(
        &self,
        project: &str,
        scope: &Scope,
        config: &AutoscalerConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&project_path(project, scope, "autoscalers"), config)
            .await
    }

    async fn delete_autoscaler(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!(
            "{}/{name}",
            project_path(project, scope, "autoscalers")
        ))
        .await
    }

    async fn get_instance_template(
        &self,
        project: &str,
        name: &str,
    ) -> Result<InstanceTemplateConfig, ComputeError> {
        self.get_json(&format!(
            "{}/{name}",
            project_path(project, &Scope::Global, "instanceTemplates")
        ))
        .await
    }

    async fn insert_instance_template(
        &self,
        project: &str,
        config: &InstanceTemplateConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(
            &project_path(project, &Scope::Global, "instanceTemplates"),
            config,
        )
        .await
    }

    async fn delete_instance_template(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!(
            "{}/{name}",
            project_path(project, &Scope::Global, "instanceTemplates")
        ))
        .await
    }

    async fn get_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<BackendServiceConfig, ComputeError> {
        self.get_json(&format!(
            "{}/{name}",
            project_path(project, scope, "backendServices")
        ))
        .await
    }

    async fn insert_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        config: &BackendServiceConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&project_path(project, scope, "backendServices"), config)
            .await
    }

    async fn delete_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!(
            "{}/{name}",
            project_path(project, scope, "backendServices")
        ))
        .await
    }

    async fn patch_backend_service(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
        config: &BackendServiceConfig,
    ) -> Result<Operation, ComputeError> {
        self.operation(
            Method::PATCH,
            &format!(
                "{}/{name}",
                project_path(project, scope, "backendServices")
            ),
            Some(config),
        )
        .await
    }

    async fn get_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<ForwardingRuleConfig, ComputeError> {
        self.get_json(&format!(
            "{}/{name}",
            project_path(project, scope, "forwardingRules")
        ))
        .await
    }

    async fn list_forwarding_rules(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<ForwardingRuleConfig>, ComputeError> {
        self.list_json(&project_path(project, scope, "forwardingRules"))
            .await
    }

    async fn insert_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        config: &ForwardingRuleConfig,
    ) -> Result<Operation, ComputeError> {
        self.post(&project_path(project, scope, "forwardingRules"), config)
            .await
    }

    async fn delete_forwarding_rule(
        &self,
        project: &str,
        scope: &Scope,
        name: &str,
    ) -> Result<Operation, ComputeError> {
        self.delete(&format!(
            "{}/{name}",
            project_path(project, scope, "forwardingRules")
        ))
        .await
    }

    async fn get_target_pool(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<TargetPoolConfig, ComputeError> {
        self.get_json(&format!("{}/{name}", region_path(project, region, "targetPools")))
            .await
    }

    async fn add_instances_to_target_pool(
        &self,
        project: &str,
        region: &str,
        pool: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!(
                "{}/{pool}/addInstance",
                region_path(project, region, "targetPools")
            ),
            &instance_refs(instance_links),
        )
        .await
    }

    async fn remove_instances_from_target_pool(
        &self,
        project: &str,
        region: &str,
        pool: &str,
        instance_links: &[String],
    ) -> Result<Operation, ComputeError> {
        self.post(
            &format!(
                "{}/{pool}/removeInstance",
                region_path(project, region, "targetPools")
            ),
            &instance_refs(instance_links),
        )
        .await
    }
}
