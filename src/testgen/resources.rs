//! Tests that parse generated Kubernetes resources instead of running anything.

use super::{header, TestCategory, LIVE_PROVIDER_ENV};
use crate::error::PipelineError;
use crate::export::kubernetes::{self, Hints, RESOURCE_DIR};
use crate::export::python::{literal, string_literal};
use crate::export::ExportContext;
use crate::manifest::ManifestKind;
use serde_json::{json, Value};

pub(super) struct Suite<'c> {
    ctx: &'c ExportContext<'c>,
    is_task: bool,
    constants: Vec<(&'static str, Value)>,
}

impl<'c> Suite<'c> {
    pub(super) fn new(ctx: &'c ExportContext<'c>) -> Result<Self, PipelineError> {
        let hints = Hints::from_context(ctx);
        let kind = ctx.kind();
        let task = ctx.task();
        let settings = kubernetes::settings(ctx)?;
        let constants = vec![
            ("NAME", json!(ctx.name())),
            ("KIND", json!(kind.as_str())),
            ("NAMESPACE", json!(hints.namespace)),
            ("IMAGE", json!(hints.image)),
            ("REPLICAS", json!(hints.replicas)),
            ("RESOURCE_FILES", json!(kubernetes::resource_files(kind))),
            ("SETTINGS", json!(settings)),
            ("SECRET_KEYS", json!(kubernetes::secret_keys(ctx))),
            ("TASK_TIMEOUT_SECONDS", json!(task.and_then(|t| t.timeout_seconds))),
        ];
        Ok(Self {
            ctx,
            is_task: kind == ManifestKind::Task,
            constants,
        })
    }

    pub(super) fn conftest(&self) -> String {
        let mut out = header(self.ctx, "Shared fixtures");
        out.push_str("import json\nimport os\nfrom pathlib import Path\n\nimport pytest\nimport yaml\n\n");
        out.push_str(&format!(
            "ROOT = Path(__file__).resolve().parent.parent\nRESOURCES = ROOT / {}\n",
            string_literal(RESOURCE_DIR)
        ));
        out.push_str(&format!(
            "# Resource checks never call a model provider.\nLIVE_PROVIDER = os.environ.get({}) == \"1\"\n\n",
            string_literal(LIVE_PROVIDER_ENV)
        ));
        for (name, value) in &self.constants {
            out.push_str(&format!("{} = {}\n", name, literal(value)));
        }
        out.push_str(CONFTEST_FIXTURES);
        out
    }

    pub(super) fn module(&self, category: TestCategory) -> String {
        let (what, body, workload_body) = match category {
            TestCategory::Unit => ("Resource well-formedness tests", UNIT, ""),
            TestCategory::Integration => (
                "Resource wiring tests",
                INTEGRATION,
                if self.is_task { "" } else { SERVICE_WIRING },
            ),
            TestCategory::Load => (
                "Capacity tests",
                LOAD,
                if self.is_task { JOB_CAPACITY } else { DEPLOYMENT_CAPACITY },
            ),
            TestCategory::Safety => ("Security posture tests", SAFETY, ""),
            TestCategory::ResourcePolicy => (
                "Policy propagation tests",
                POLICY,
                if self.is_task { JOB_DEADLINE } else { "" },
            ),
        };
        let mut out = header(self.ctx, what);
        out.push_str(body);
        out.push_str(workload_body);
        out
    }
}

const CONFTEST_FIXTURES: &str = r#"

def load(name):
    return yaml.safe_load((RESOURCES / name).read_text())


@pytest.fixture(scope="session")
def resources():
    return {name: load(name) for name in RESOURCE_FILES}


@pytest.fixture(scope="session")
def workload(resources):
    return resources["job.yaml" if KIND == "Task" else "deployment.yaml"]


@pytest.fixture(scope="session")
def pod_spec(workload):
    return workload["spec"]["template"]["spec"]


@pytest.fixture(scope="session")
def container(pod_spec):
    return pod_spec["containers"][0]


@pytest.fixture(scope="session")
def interface():
    return json.loads((RESOURCES / "interface.json").read_text())
"#;

const UNIT: &str = r#"import pytest

from conftest import NAME, NAMESPACE, RESOURCE_FILES, load


@pytest.mark.parametrize("name", RESOURCE_FILES + ["kustomization.yaml"])
def test_resource_parses(name):
    assert isinstance(load(name), dict)


@pytest.mark.parametrize("name", RESOURCE_FILES)
def test_resource_metadata(resources, name):
    resource = resources[name]
    assert resource["apiVersion"]
    assert resource["kind"]
    assert resource["metadata"]["name"].startswith(NAME)
    assert resource["metadata"]["namespace"] == NAMESPACE
    assert resource["metadata"]["labels"]["app.kubernetes.io/managed-by"] == "agentspec"


def test_interface_names_workload(interface):
    assert interface["name"] == NAME
"#;

const INTEGRATION: &str = r#"from conftest import NAME, RESOURCE_FILES, RESOURCES, load


def test_kustomization_lists_every_resource():
    kustomization = load("kustomization.yaml")
    assert kustomization["resources"] == RESOURCE_FILES
    assert all((RESOURCES / name).exists() for name in kustomization["resources"])


def test_container_reads_config_and_secret(resources, container):
    refs = container["envFrom"]
    assert {"configMapRef": {"name": resources["configmap.yaml"]["metadata"]["name"]}} in refs
    assert {"secretRef": {"name": resources["secret.yaml"]["metadata"]["name"]}} in refs


def test_pod_labels_carry_name(workload):
    labels = workload["spec"]["template"]["metadata"]["labels"]
    assert labels["app.kubernetes.io/name"] == NAME
"#;

const SERVICE_WIRING: &str = r#"

def test_selector_matches_pod_labels(workload):
    selector = workload["spec"]["selector"]["matchLabels"]
    labels = workload["spec"]["template"]["metadata"]["labels"]
    assert selector.items() <= labels.items()


def test_service_targets_pods(resources, workload):
    service = resources["service.yaml"]
    labels = workload["spec"]["template"]["metadata"]["labels"]
    assert service["spec"]["selector"].items() <= labels.items()
    port_names = {p["name"] for p in workload["spec"]["template"]["spec"]["containers"][0]["ports"]}
    assert all(p["targetPort"] in port_names for p in service["spec"]["ports"])


def test_probes_match_interface(container, interface):
    assert container["livenessProbe"]["httpGet"]["path"] == interface["probes"]["liveness"]
    assert container["readinessProbe"]["httpGet"]["path"] == interface["probes"]["readiness"]
"#;

const LOAD: &str = r#"from conftest import IMAGE, REPLICAS


def test_image_matches_hint(container):
    assert container["image"] == IMAGE


def test_resource_requests_and_limits(container):
    assert container["resources"]["requests"]["cpu"]
    assert container["resources"]["requests"]["memory"]
    assert container["resources"]["limits"]["memory"]
"#;

const DEPLOYMENT_CAPACITY: &str = r#"

def test_replicas_match_hint(workload):
    assert workload["spec"]["replicas"] == REPLICAS
"#;

const JOB_CAPACITY: &str = r#"

def test_job_does_not_restart_in_place(pod_spec, workload):
    assert pod_spec["restartPolicy"] == "Never"
    assert workload["spec"]["backoffLimit"] >= 0
"#;

const SAFETY: &str = r#"import re

from conftest import SECRET_KEYS

CREDENTIAL = re.compile(r"(sk-[A-Za-z0-9]{16,}|AKIA[0-9A-Z]{16}|-----BEGIN [A-Z ]*PRIVATE KEY-----)")


def test_runs_as_non_root(container):
    context = container["securityContext"]
    assert context["runAsNonRoot"] is True
    assert context["allowPrivilegeEscalation"] is False


def test_secret_names_keys_only(resources):
    data = resources["secret.yaml"].get("stringData") or {}
    assert sorted(data) == SECRET_KEYS
    assert all(value == "" for value in data.values())
    assert "data" not in resources["secret.yaml"]


def test_no_inline_credentials(resources, container):
    for value in resources["configmap.yaml"].get("data", {}).values():
        assert not CREDENTIAL.search(str(value))
    assert "env" not in container
"#;

const POLICY: &str = r#"from conftest import SETTINGS, TASK_TIMEOUT_SECONDS


def test_settings_propagated(resources):
    assert resources["configmap.yaml"]["data"] == SETTINGS
"#;

const JOB_DEADLINE: &str = r#"

def test_job_deadline_matches_timeout(workload):
    assert workload["spec"].get("activeDeadlineSeconds") == TASK_TIMEOUT_SECONDS
"#;
