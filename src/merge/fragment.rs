//! Field lists for the fragment structs.
//!
//! Each impl names the fields to fold; the rule applied to a field comes from
//! its type (see `rules.rs`). A new fragment field only needs adding here.

use scheduler_schema::{
    AgentChoice, ApprovePolicy, ConfigUpdaterPolicy, ContextPolicy, Fragment,
    GlobalProtectionPolicy, LgtmPolicy, MergePolicy, ProtectionPolicy, Restrictions, ReviewPolicy,
    StatusChecks, TriggerPolicy,
};

use super::{Merge, MergeError};

macro_rules! merge_fields {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl Merge for $ty {
            fn merge_from(&mut self, donor: &Self) -> Result<(), MergeError> {
                $(
                    self.$field
                        .merge_from(&donor.$field)
                        .map_err(|e| e.within(stringify!($field)))?;
                )+
                Ok(())
            }
        }
    };
}

merge_fields!(Fragment {
    scheduler_agent,
    policy,
    presubmits,
    postsubmits,
    periodics,
    trigger,
    approve,
    lgtm,
    external_plugins,
    plugins,
    merger,
    config_updater,
    welcome,
    attachments,
});

merge_fields!(AgentChoice { agent });

merge_fields!(GlobalProtectionPolicy {
    protect_tested,
    policy,
    branches,
});

merge_fields!(ProtectionPolicy {
    protect,
    required_status_checks,
    admins,
    restrictions,
    required_pull_request_reviews,
    include,
    exclude,
});

merge_fields!(StatusChecks { contexts, strict });

merge_fields!(Restrictions { users, teams });

merge_fields!(ReviewPolicy {
    dismiss_stale_reviews,
    require_code_owner_reviews,
    required_approving_review_count,
});

merge_fields!(TriggerPolicy {
    trusted_org,
    join_org_url,
    only_org_members,
    ignore_ok_to_test,
});

merge_fields!(ApprovePolicy {
    issue_required,
    require_self_approval,
    lgtm_acts_as_approve,
    ignore_review_state,
});

merge_fields!(LgtmPolicy {
    review_acts_as_lgtm,
    store_tree_hash,
    trusted_team_for_sticky_lgtm,
});

merge_fields!(MergePolicy {
    sync_period,
    status_update_period,
    target_url,
    pr_status_base_url,
    blocker_label,
    squash_label,
    max_goroutines,
    merge_method,
    queries,
    context_policy,
});

merge_fields!(ContextPolicy {
    required_contexts,
    optional_contexts,
    required_if_present_contexts,
    skip_unknown_contexts,
    from_branch_protection,
});

merge_fields!(ConfigUpdaterPolicy { map });
