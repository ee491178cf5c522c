use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check,
    compare::{Comparison, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList, DEFAULT_TENANCY,
};
use consul_config_controller_k8s_api::{
    sameness_group::SamenessGroupMember, ResourceExt, SamenessGroup,
};

impl ConfigEntry for SamenessGroup {
    const REMOTE_KIND: &'static str = "sameness-group";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &["Members[].Partition"],
        zero_is_absent: &[],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        let name = self.name_any();
        if name.is_empty() {
            errs.push(FieldError::invalid(
                path.child("name"),
                &name,
                "sameness groups must have a name defined",
            ));
        }
        let ns = self.namespace().unwrap_or_default();
        if !ns.is_empty() && ns != DEFAULT_TENANCY {
            errs.push(FieldError::invalid(
                path.child("name"),
                &caps.destination_namespace,
                "sameness groups must reside in the default namespace",
            ));
        }

        let members_path = path.child("members");
        if spec.members.is_empty() {
            errs.push(FieldError::invalid(
                members_path.clone(),
                Value::repr(&spec.members),
                "sameness groups must have at least one member",
            ));
        }

        let duplicates = check::duplicates(&spec.members);
        for (i, member) in spec.members.iter().enumerate() {
            errs.extend(validate_member(&members_path.index(i), member));
            if duplicates.contains(&i) {
                errs.push(FieldError::invalid(
                    members_path.index(i),
                    Value::repr(member),
                    "sameness group members must be unique",
                ));
            }
        }

        let includes_local =
            spec.include_local || spec.members.iter().any(|m| m.partition == caps.partition);
        if !includes_local {
            errs.push(FieldError::invalid(
                members_path,
                spec.include_local,
                "the local partition must be a member of sameness groups",
            ));
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::SamenessGroup {
            name: self.name_any(),
            default_for_failover: spec.default_for_failover,
            include_local: spec.include_local,
            members: spec.members.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::SamenessGroup::default()
        }
        .into()
    }

    /// Sameness groups always live in the default namespace.
    fn mirroring_namespace(&self) -> String {
        DEFAULT_TENANCY.to_string()
    }
}

fn validate_member(path: &Path, member: &SamenessGroupMember) -> Option<FieldError> {
    let detail = match (member.partition.is_empty(), member.peer.is_empty()) {
        (true, true) => "sameness group members must specify either partition or peer",
        (false, false) => {
            "sameness group members cannot specify both partition and peer in the same entry"
        }
        _ => return None,
    };
    Some(FieldError::invalid(path.clone(), Value::repr(member), detail))
}

impl ToRemote for SamenessGroupMember {
    type Remote = remote::SamenessGroupMember;

    fn to_remote(&self) -> Self::Remote {
        remote::SamenessGroupMember {
            partition: self.partition.clone(),
            peer: self.peer.clone(),
        }
    }
}
