//! Conversion of a validated [`Stack`] into a [`Template`].
//!
//! Resources are emitted by walking the stack's resource graph in deploy
//! order. Each model resource expands into one or more template resources
//! (a network becomes a VPC, subnets, route tables, gateways, ...).

use serde_json::{json, Value};
use smart_access_core::{
    api::AllowedOrigins, ApiResource, GraphNode, LogicalId, PathSegment, Protocol,
    ResourceKind, ResourceParent, Route, Stack, Subnet, SubnetKind,
};

use crate::error::SynthError;
use crate::intrinsic::{self, get_att, join, reference, secret_field, sub};
use crate::template::{Output, Template, TemplateResource};

/// Bucket the deployment tool uploads function packages to.
const ASSET_BUCKET: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";

const LAMBDA_BASIC_EXECUTION_POLICY: &str =
    ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Produces the deployment template for `stack`.
///
/// # Errors
/// Returns [`SynthError::Core`] if the stack fails validation, and
/// [`SynthError::DuplicateResource`] or [`SynthError::MissingResource`] if
/// the expanded resources are inconsistent.
pub fn synthesize(stack: &Stack) -> Result<Template, SynthError> {
    stack.validate()?;
    let graph = stack.graph()?;
    let order = graph.deploy_order()?;

    let mut synth = Synthesizer {
        stack,
        template: Template::new(format!(
            "smart-access stack {} ({})",
            stack.config.stack_name, stack.config.environment
        )),
        methods: Vec::new(),
    };

    for node in &order {
        synth.emit(node)?;
    }
    synth.emit_deployment()?;

    tracing::info!(
        stack = %stack.config.stack_name,
        resources = synth.template.resources.len(),
        "synthesized template"
    );

    Ok(synth.template)
}

struct Synthesizer<'a> {
    stack: &'a Stack,
    template: Template,
    /// Every API method emitted so far; the deployment depends on all of them.
    methods: Vec<String>,
}

impl<'a> Synthesizer<'a> {
    fn emit(&mut self, node: &GraphNode) -> Result<(), SynthError> {
        tracing::debug!(id = %node.id, kind = %node.kind, "emitting resource");
        match node.kind {
            ResourceKind::Network => self.emit_network(),
            ResourceKind::FirewallRuleSet => self.emit_firewall(),
            ResourceKind::Secret => self.emit_secret(),
            ResourceKind::Database => self.emit_database(),
            ResourceKind::Api => self.emit_api(),
            ResourceKind::ApiResource => self.emit_api_resource(&node.id),
            ResourceKind::Route => self.emit_route(&node.id),
            ResourceKind::Function => self.emit_function(&node.id),
            _ => Ok(()),
        }
    }

    // ── Network ──────────────────────────────────────────────────────────────

    fn emit_network(&mut self) -> Result<(), SynthError> {
        let stack = self.stack;
        let network = &stack.network;
        let vpc = network.id.as_str();
        let igw = network.id.child("IGW")?;
        let attachment = network.id.child("VPCGW")?;

        self.template.insert(
            vpc,
            TemplateResource::new(
                "AWS::EC2::VPC",
                json!({
                    "CidrBlock": network.cidr.to_string(),
                    "EnableDnsHostnames": true,
                    "EnableDnsSupport": true,
                    "InstanceTenancy": "default",
                    "Tags": name_tag(stack, &network.id),
                }),
            ),
        )?;
        self.template.insert(
            igw.as_str(),
            TemplateResource::new(
                "AWS::EC2::InternetGateway",
                json!({ "Tags": name_tag(stack, &network.id) }),
            ),
        )?;
        self.template.insert(
            attachment.as_str(),
            TemplateResource::new(
                "AWS::EC2::VPCGatewayAttachment",
                json!({ "InternetGatewayId": reference(&igw), "VpcId": reference(vpc) }),
            ),
        )?;

        for subnet in &network.subnets {
            self.emit_subnet(subnet, &igw, &attachment)?;
        }
        Ok(())
    }

    fn emit_subnet(
        &mut self,
        subnet: &Subnet,
        igw: &LogicalId,
        attachment: &LogicalId,
    ) -> Result<(), SynthError> {
        let stack = self.stack;
        let vpc = stack.network.id.as_str();
        let route_table = subnet.id.child("RouteTable")?;
        let association = subnet.id.child("RouteTableAssociation")?;
        let default_route = subnet.id.child("DefaultRoute")?;
        let public = subnet.kind == SubnetKind::Public;

        self.template.insert(
            subnet.id.as_str(),
            TemplateResource::new(
                "AWS::EC2::Subnet",
                json!({
                    "AvailabilityZone": subnet.availability_zone,
                    "CidrBlock": subnet.cidr.to_string(),
                    "MapPublicIpOnLaunch": public,
                    "Tags": [
                        { "Key": "Name", "Value": format!("{}/{}", stack.config.stack_name, subnet.id) },
                        { "Key": "subnet-type", "Value": if public { "Public" } else { "Private" } },
                    ],
                    "VpcId": reference(vpc),
                }),
            ),
        )?;
        self.template.insert(
            route_table.as_str(),
            TemplateResource::new(
                "AWS::EC2::RouteTable",
                json!({ "Tags": name_tag(stack, &subnet.id), "VpcId": reference(vpc) }),
            ),
        )?;
        self.template.insert(
            association.as_str(),
            TemplateResource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({ "RouteTableId": reference(&route_table), "SubnetId": reference(&subnet.id) }),
            ),
        )?;

        if public {
            let eip = subnet.id.child("EIP")?;
            let nat = subnet.id.child("NATGateway")?;
            self.template.insert(
                default_route.as_str(),
                TemplateResource::new(
                    "AWS::EC2::Route",
                    json!({
                        "DestinationCidrBlock": "0.0.0.0/0",
                        "GatewayId": reference(igw),
                        "RouteTableId": reference(&route_table),
                    }),
                )
                .depends_on([attachment.as_str()]),
            )?;
            self.template.insert(
                eip.as_str(),
                TemplateResource::new(
                    "AWS::EC2::EIP",
                    json!({ "Domain": "vpc", "Tags": name_tag(stack, &subnet.id) }),
                ),
            )?;
            self.template.insert(
                nat.as_str(),
                TemplateResource::new(
                    "AWS::EC2::NatGateway",
                    json!({
                        "AllocationId": get_att(&eip, "AllocationId"),
                        "SubnetId": reference(&subnet.id),
                        "Tags": name_tag(stack, &subnet.id),
                    }),
                )
                .depends_on([default_route.as_str(), association.as_str()]),
            )?;
        } else {
            let nat = self.nat_gateway_for(subnet)?;
            self.template.insert(
                default_route.as_str(),
                TemplateResource::new(
                    "AWS::EC2::Route",
                    json!({
                        "DestinationCidrBlock": "0.0.0.0/0",
                        "NatGatewayId": reference(&nat),
                        "RouteTableId": reference(&route_table),
                    }),
                ),
            )?;
        }
        Ok(())
    }

    /// NAT gateway of the public subnet in the same zone as `private`.
    fn nat_gateway_for(&self, private: &Subnet) -> Result<LogicalId, SynthError> {
        let public = self
            .stack
            .network
            .subnets_of(SubnetKind::Public)
            .find(|s| s.availability_zone == private.availability_zone)
            .ok_or_else(|| SynthError::MissingResource {
                from: private.id.to_string(),
                missing: format!("public subnet in {}", private.availability_zone),
            })?;
        Ok(public.id.child("NATGateway")?)
    }

    // ── Security ─────────────────────────────────────────────────────────────

    fn emit_firewall(&mut self) -> Result<(), SynthError> {
        let stack = self.stack;
        let firewall = &stack.firewall;

        let ingress: Vec<Value> = firewall
            .ingress
            .iter()
            .map(|rule| {
                let mut entry = json!({
                    "CidrIp": rule.peer.cidr().to_string(),
                    "Description": rule.description,
                    "IpProtocol": rule.protocol.code(),
                });
                if rule.protocol != Protocol::All {
                    entry["FromPort"] = json!(rule.ports.from);
                    entry["ToPort"] = json!(rule.ports.to);
                }
                entry
            })
            .collect();

        let egress = if firewall.allow_all_outbound {
            json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }])
        } else {
            json!([])
        };

        self.template.insert(
            firewall.id.as_str(),
            TemplateResource::new(
                "AWS::EC2::SecurityGroup",
                json!({
                    "GroupDescription": firewall.description,
                    "SecurityGroupEgress": egress,
                    "SecurityGroupIngress": ingress,
                    "VpcId": reference(&firewall.network),
                }),
            ),
        )
    }

    // ── Data ─────────────────────────────────────────────────────────────────

    fn emit_secret(&mut self) -> Result<(), SynthError> {
        let stack = self.stack;
        let secret = &stack.secret;
        let generation = &secret.generation;
        let template = serde_json::to_string(&generation.template)?;

        self.template.insert(
            secret.id.as_str(),
            TemplateResource::new(
                "AWS::SecretsManager::Secret",
                json!({
                    "Description": secret.description,
                    "GenerateSecretString": {
                        "ExcludePunctuation": generation.exclude_punctuation,
                        "GenerateStringKey": generation.generate_key,
                        "PasswordLength": generation.length,
                        "SecretStringTemplate": template,
                    },
                    "Name": secret.name,
                }),
            )
            .removal_policy("Delete"),
        )
    }

    fn emit_database(&mut self) -> Result<(), SynthError> {
        let stack = self.stack;
        let db = &stack.database;
        let subnet_group = db.id.child("SubnetGroup")?;
        let attachment = db.credentials.child("Attachment")?;

        let private_subnets: Vec<Value> = stack
            .network
            .subnets_of(SubnetKind::Private)
            .map(|s| reference(&s.id))
            .collect();
        let security_groups: Vec<Value> = db
            .firewall_rule_sets
            .iter()
            .map(|id| get_att(id, "GroupId"))
            .collect();
        let password_key = stack.secret.generation.generate_key.as_str();
        let policy = db.removal_policy.deletion_policy();

        self.template.insert(
            subnet_group.as_str(),
            TemplateResource::new(
                "AWS::RDS::DBSubnetGroup",
                json!({
                    "DBSubnetGroupDescription": format!("Subnet group for {} database", db.id),
                    "SubnetIds": private_subnets,
                }),
            )
            .removal_policy(policy),
        )?;
        self.template.insert(
            db.id.as_str(),
            TemplateResource::new(
                "AWS::RDS::DBInstance",
                json!({
                    "AllocatedStorage": db.allocated_storage_gib.to_string(),
                    "BackupRetentionPeriod": db.backup_retention_days,
                    "CopyTagsToSnapshot": true,
                    "DBInstanceClass": db.instance_type.to_string(),
                    "DBName": db.database_name,
                    "DBSubnetGroupName": reference(&subnet_group),
                    "DeleteAutomatedBackups": db.delete_automated_backups,
                    "Engine": db.engine.name(),
                    "EngineVersion": db.engine.version().to_string(),
                    "MasterUserPassword": secret_field(&db.credentials, password_key),
                    "MasterUsername": secret_field(&db.credentials, "username"),
                    "Port": db.port.to_string(),
                    "PubliclyAccessible": false,
                    "StorageType": "gp2",
                    "VPCSecurityGroups": security_groups,
                }),
            )
            .removal_policy(policy),
        )?;
        self.template.insert(
            attachment.as_str(),
            TemplateResource::new(
                "AWS::SecretsManager::SecretTargetAttachment",
                json!({
                    "SecretId": reference(&db.credentials),
                    "TargetId": reference(&db.id),
                    "TargetType": "AWS::RDS::DBInstance",
                }),
            ),
        )
    }

    // ── API ──────────────────────────────────────────────────────────────────

    fn emit_api(&mut self) -> Result<(), SynthError> {
        let stack = self.stack;
        let api = &stack.api;
        self.template.insert(
            api.id.as_str(),
            TemplateResource::new("AWS::ApiGateway::RestApi", json!({ "Name": api.name })),
        )?;
        let root = get_att(&api.id, "RootResourceId");
        self.emit_cors_preflight(&api.id, root)
    }

    fn emit_api_resource(&mut self, id: &LogicalId) -> Result<(), SynthError> {
        let stack = self.stack;
        let api = &stack.api;
        let resource = self.api_resource(id)?;
        let parent = match &resource.parent {
            ResourceParent::Root => get_att(&api.id, "RootResourceId"),
            ResourceParent::Resource(parent) => reference(parent),
            _ => unreachable!("unknown ResourceParent variant"),
        };
        self.template.insert(
            id.as_str(),
            TemplateResource::new(
                "AWS::ApiGateway::Resource",
                json!({
                    "ParentId": parent,
                    "PathPart": resource.path_part.to_string(),
                    "RestApiId": reference(&api.id),
                }),
            ),
        )?;
        self.emit_cors_preflight(id, reference(id))
    }

    fn api_resource(&self, id: &LogicalId) -> Result<&'a ApiResource, SynthError> {
        self.stack
            .resources
            .resources
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| SynthError::MissingResource {
                from: self.stack.api.id.to_string(),
                missing: id.to_string(),
            })
    }

    /// `OPTIONS` mock method answering CORS preflight requests on `owner`.
    fn emit_cors_preflight(&mut self, owner: &LogicalId, resource_id: Value) -> Result<(), SynthError> {
        let stack = self.stack;
        let api = &stack.api;
        let cors = &api.cors;
        let method_id = owner.child("OPTIONS")?;
        let mut response_parameters = json!({
            "method.response.header.Access-Control-Allow-Headers": format!("'{}'", cors.allow_headers),
            "method.response.header.Access-Control-Allow-Methods": format!("'{}'", cors.allowed_methods_header()),
            "method.response.header.Access-Control-Allow-Origin": format!("'{}'", cors.allowed_origin_header()),
        });
        let mut method_parameters = json!({
            "method.response.header.Access-Control-Allow-Headers": true,
            "method.response.header.Access-Control-Allow-Methods": true,
            "method.response.header.Access-Control-Allow-Origin": true,
        });
        if !matches!(cors.allow_origins, AllowedOrigins::All) {
            response_parameters["method.response.header.Vary"] = json!("'Origin'");
            method_parameters["method.response.header.Vary"] = json!(true);
        }

        self.template.insert(
            method_id.as_str(),
            TemplateResource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "ApiKeyRequired": false,
                    "AuthorizationType": "NONE",
                    "HttpMethod": "OPTIONS",
                    "Integration": {
                        "IntegrationResponses": [{
                            "ResponseParameters": response_parameters,
                            "StatusCode": "204",
                        }],
                        "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                        "Type": "MOCK",
                    },
                    "MethodResponses": [{
                        "ResponseParameters": method_parameters,
                        "StatusCode": "204",
                    }],
                    "ResourceId": resource_id,
                    "RestApiId": reference(&api.id),
                }),
            ),
        )?;
        self.methods.push(method_id.to_string());
        Ok(())
    }

    fn emit_route(&mut self, id: &LogicalId) -> Result<(), SynthError> {
        let stack = self.stack;
        let api = &stack.api;
        let route = self.route(id)?;
        let function = stack
            .function(&route.function)
            .ok_or_else(|| SynthError::MissingResource {
                from: id.to_string(),
                missing: route.function.to_string(),
            })?;
        let resource_id = match stack.resources.find(&route.path) {
            Some(resource) => reference(&resource.id),
            None => get_att(&api.id, "RootResourceId"),
        };
        let region = stack.config.region.as_str();

        self.template.insert(
            id.as_str(),
            TemplateResource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "AuthorizationType": route.authorization.provider_type(),
                    "HttpMethod": route.method.as_str(),
                    "Integration": {
                        "IntegrationHttpMethod": "POST",
                        "Type": "AWS_PROXY",
                        "Uri": join(vec![
                            json!("arn:"),
                            reference(intrinsic::PARTITION),
                            json!(format!(":apigateway:{region}:lambda:path/2015-03-31/functions/")),
                            get_att(&function.id, "Arn"),
                            json!("/invocations"),
                        ]),
                    },
                    "ResourceId": resource_id,
                    "RestApiId": reference(&api.id),
                }),
            ),
        )?;

        let permission = id.child("Permission")?;
        self.template.insert(
            permission.as_str(),
            TemplateResource::new(
                "AWS::Lambda::Permission",
                json!({
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": get_att(&function.id, "Arn"),
                    "Principal": "apigateway.amazonaws.com",
                    "SourceArn": join(vec![
                        json!("arn:"),
                        reference(intrinsic::PARTITION),
                        json!(format!(":execute-api:{region}:")),
                        reference(intrinsic::ACCOUNT_ID),
                        json!(":"),
                        reference(&api.id),
                        json!(format!("/*/{}{}", route.method, source_arn_path(route))),
                    ]),
                }),
            ),
        )?;
        self.methods.push(id.to_string());
        Ok(())
    }

    fn route(&self, id: &LogicalId) -> Result<&'a Route, SynthError> {
        let stack = self.stack;
        for route in &stack.routes {
            if &stack.route_id(route)? == id {
                return Ok(route);
            }
        }
        Err(SynthError::MissingResource {
            from: self.stack.api.id.to_string(),
            missing: id.to_string(),
        })
    }

    fn emit_deployment(&mut self) -> Result<(), SynthError> {
        let stack = self.stack;
        let api = &stack.api;
        let deployment = api.id.child("Deployment")?;
        let stage = api.id.child(&format!("DeploymentStage{}", api.stage_name))?;

        self.template.insert(
            deployment.as_str(),
            TemplateResource::new(
                "AWS::ApiGateway::Deployment",
                json!({
                    "Description": "Automatically created by the RestApi construct",
                    "RestApiId": reference(&api.id),
                }),
            )
            .depends_on(self.methods.iter().cloned()),
        )?;
        self.template.insert(
            stage.as_str(),
            TemplateResource::new(
                "AWS::ApiGateway::Stage",
                json!({
                    "DeploymentId": reference(&deployment),
                    "RestApiId": reference(&api.id),
                    "StageName": api.stage_name,
                }),
            ),
        )?;

        self.template.outputs.insert(
            "ApiEndpoint".to_owned(),
            Output::new(
                join(vec![
                    json!("https://"),
                    reference(&api.id),
                    json!(format!(".execute-api.{}.", stack.config.region)),
                    reference(intrinsic::URL_SUFFIX),
                    json!("/"),
                    reference(&stage),
                    json!("/"),
                ]),
                format!("Invoke URL of {}", api.name),
            ),
        );
        Ok(())
    }

    // ── Functions ────────────────────────────────────────────────────────────

    fn emit_function(&mut self, id: &LogicalId) -> Result<(), SynthError> {
        let stack = self.stack;
        let function = stack
            .function(id)
            .ok_or_else(|| SynthError::MissingResource {
                from: stack.config.stack_name.clone(),
                missing: id.to_string(),
            })?;
        let role = id.child("ServiceRole")?;

        self.template.insert(
            role.as_str(),
            TemplateResource::new(
                "AWS::IAM::Role",
                json!({
                    "AssumeRolePolicyDocument": {
                        "Statement": [{
                            "Action": "sts:AssumeRole",
                            "Effect": "Allow",
                            "Principal": { "Service": "lambda.amazonaws.com" },
                        }],
                        "Version": "2012-10-17",
                    },
                    "ManagedPolicyArns": [join(vec![
                        json!("arn:"),
                        reference(intrinsic::PARTITION),
                        json!(LAMBDA_BASIC_EXECUTION_POLICY),
                    ])],
                }),
            ),
        )?;

        let mut properties = json!({
            "Architectures": [function.architecture.identifier()],
            "Code": {
                "S3Bucket": sub(ASSET_BUCKET),
                "S3Key": format!("{}.zip", function.entry),
            },
            "Handler": function.handler,
            "MemorySize": function.memory_mb,
            "Role": get_att(&role, "Arn"),
            "Runtime": function.runtime.identifier(),
            "Timeout": function.timeout_secs,
        });
        if !function.environment.is_empty() {
            properties["Environment"] = json!({ "Variables": function.environment });
        }

        self.template.insert(
            id.as_str(),
            TemplateResource::new("AWS::Lambda::Function", properties).depends_on([role.as_str()]),
        )
    }
}

fn name_tag(stack: &Stack, id: &LogicalId) -> Value {
    json!([{ "Key": "Name", "Value": format!("{}/{}", stack.config.stack_name, id) }])
}

/// Path part of an execute-api source ARN; parameters match any value.
fn source_arn_path(route: &Route) -> String {
    route
        .path
        .iter()
        .map(|segment| match segment {
            PathSegment::Literal(s) => format!("/{s}"),
            PathSegment::Parameter(_) => "/*".to_owned(),
            _ => unreachable!("unknown PathSegment variant"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smart_access_core::{assemble, DeployEnvironment, StackConfig};

    fn stack() -> Stack {
        match assemble(&StackConfig::new(DeployEnvironment::Staging)) {
            Ok(s) => s,
            Err(e) => panic!("assembly failed: {e}"),
        }
    }

    #[test]
    fn source_arn_path_wildcards_parameters() {
        let stack = stack();
        let paths: Vec<String> = stack.routes.iter().map(source_arn_path).collect();
        assert_eq!(paths, vec!["/users", "/users", "/users/*"]);
    }

    #[test]
    fn private_routes_use_nat_of_same_zone() {
        let stack = stack();
        let template = match synthesize(&stack) {
            Ok(t) => t,
            Err(e) => panic!("synthesis failed: {e}"),
        };
        let route = &template.resources["MyVPCPrivateSubnet2DefaultRoute"];
        assert_eq!(
            route.properties["NatGatewayId"],
            json!({ "Ref": "MyVPCPublicSubnet2NATGateway" })
        );
    }

    #[test]
    fn invalid_stack_is_not_synthesized() {
        let mut stack = stack();
        stack.functions.pop();
        assert!(matches!(synthesize(&stack), Err(SynthError::Core(_))));
    }
}
