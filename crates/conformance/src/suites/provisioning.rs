//! MS-ASPROV: security policy provisioning over ActiveSync

use log::{debug, info};

use super::{Case, Suite};
use crate::activesync::{
    ActiveSyncAdapter, FolderSyncRequest, FolderSyncResponse, PROVISIONING_POLICY_TYPE,
    ProvisionRequest, ProvisionResponse, ProvisioningSutControl, Status,
};
use crate::capture::Site;
use crate::context::UserInformation;
use crate::error::Result;
use crate::properties::TestProperties;

pub const PROTOCOL: &str = "MS-ASPROV";

/// Model reported in DeviceInformation on the initial request
const DEVICE_MODEL: &str = "ASPROVTest";

/// Protocol versions whose initial Provision request carries DeviceInformation
const DEVICE_INFORMATION_VERSIONS: &[&str] = &["14.1", "16.0", "16.1"];

const UNKNOWN_POLICY_TYPE: &str = "MS-EAS-Provisioning-Unknown";

/// Device type used by cases that must not disturb the default device
const SECONDARY_DEVICE_TYPE: &str = "ASPROVSecondary";

pub struct ProvisioningSuite<'a> {
    adapter: &'a dyn ActiveSyncAdapter,
    sut: &'a dyn ProvisioningSutControl,
    properties: TestProperties,
    site: Site,
    protocol_version: String,
    sut_computer_name: String,
    default_device_type: String,
    device_type: String,
    users: [UserInformation; 3],
    current_user: usize,
}

impl<'a> ProvisioningSuite<'a> {
    pub fn setup(
        adapter: &'a dyn ActiveSyncAdapter,
        sut: &'a dyn ProvisioningSutControl,
        properties: TestProperties,
    ) -> Result<Self> {
        let default_device_type = properties.get("DeviceType")?;
        let mut suite = Self {
            adapter,
            sut,
            site: Site::new(PROTOCOL),
            protocol_version: properties.protocol_version()?,
            sut_computer_name: properties.get("SutComputerName")?,
            device_type: default_device_type.clone(),
            default_device_type,
            users: [properties.user(1)?, properties.user(2)?, properties.user(3)?],
            current_user: 0,
            properties,
        };
        suite.adapter.apply_device_type(&suite.device_type);
        suite.switch_user(0)?;
        Ok(suite)
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn teardown(mut self) -> Result<Site> {
        self.cleanup()?;
        Ok(self.site)
    }

    /// Download, acknowledge, then sync with the final policy key
    pub fn acknowledge_security_policy_settings(&mut self) -> Result<()> {
        let response = self.call_provision(None, PROVISIONING_POLICY_TYPE)?;
        self.site.capture_if_eq(
            Status::SUCCESS,
            response.status,
            394,
            "[In Status (Provision)] Value 1 means Success.",
        )?;

        let policy = self.site.require(response.policy, "initial Provision response has no Policy")?;
        let complete = policy.data.is_some()
            && policy.policy_key.is_some()
            && policy.policy_type.is_some()
            && policy.status.0 != 0;
        self.site.capture_if_true(
            complete,
            310,
            "[In Policy] In the initial Provision command response, the Policy element has only the following child elements: PolicyType, PolicyKey, Status, Data.",
        )?;
        self.site.capture_if_true(
            complete,
            417,
            "[In Abstract Data Model] In order 1, the server response contains the policy type, policy key, data, and status code.",
        )?;
        self.site.capture_if_eq(
            Status::SUCCESS,
            policy.status,
            378,
            "[In Status (Policy)] Value 1 means Success.",
        )?;
        self.site.capture_if_some(
            &policy.data,
            209,
            "[In Data] It [Data element] is a required child element of the Policy element in responses to initial Provision command requests.",
        )?;

        let temporary_key = self.site.require(policy.policy_key, "initial Provision response has no PolicyKey")?;
        let response = self.call_provision(Some(&temporary_key), PROVISIONING_POLICY_TYPE)?;
        self.site.capture_if_eq(
            Status::SUCCESS,
            response.status,
            678,
            "[In Provision Command Errors] [The meaning of status value] 1 [is] Success.",
        )?;
        self.site.capture_if_true(
            response.policy.is_some() && response.status.is_success(),
            441,
            "[In Provision Command Errors] [The cause of status value 1 is] The Policies element contains information about security policies.",
        )?;
        self.site.capture(
            650,
            "[In Responding to an Initial Request] The value of the PolicyKey element is a temporary policy key that will only be valid for an acknowledgment request.",
        );
        self.site.capture(
            657,
            "[In Responding to a Security Policy Settings Acknowledgment] The server MUST ensure that the current policy key sent by the client in a security policy settings acknowledgment matches the temporary policy key issued by the server.",
        );

        let policy = self.site.require(response.policy, "acknowledgement response has no Policy")?;
        let complete =
            policy.policy_key.is_some() && policy.policy_type.is_some() && policy.status.0 != 0;
        self.site.capture_if_true(
            complete,
            605,
            "[In Policy] In the acknowledgment Provision command response, the Policy element has the following child elements: PolicyType, PolicyKey, Status.",
        )?;
        self.site.capture_if_true(
            complete,
            419,
            "[In Abstract Data Model] In order 2, the server response contains the policy type, policy key, and status code to indicate that the server recorded the client's acknowledgement.",
        )?;
        for (id, description) in [
            (688, "[In Provision Command Errors] [The meaning of status value] 1 [is] Success."),
            (466, "[In Provision Command Errors] [The cause of status value 1 is] The requested policy data is included in the response."),
            (703, "[In Provision Command Errors] [When the scope is] Policy, [the meaning of status value] 1 [is] Success."),
            (495, "[In Provision Command Errors] [When the scope is Policy], [the cause of status value 1 is] The requested policy data is included in the response."),
        ] {
            self.site.capture_if_eq(Status::SUCCESS, policy.status, id, description)?;
        }
        self.site.capture_if_none(
            &policy.data,
            601,
            "[In Data] It [Data element] is not present in responses to acknowledgment requests.",
        )?;

        let final_key = self.site.require(policy.policy_key, "acknowledgement response has no PolicyKey")?;
        self.adapter.apply_policy_key(&final_key);
        let folders = self.folder_sync()?;
        self.site.assert_eq(200, folders.http_status, "FolderSync HTTP status with the final policy key")?;
        self.site.capture_if_eq(
            Status::SUCCESS,
            folders.status,
            662,
            "[In Responding to a Security Policy Settings Acknowledgment] The value of the PolicyKey element is a permanent policy key that is valid for subsequent command requests from the client.",
        )
    }

    /// User 3 is allowed to sync from a device that never provisioned
    pub fn without_acknowledging_security_policy_settings(&mut self) -> Result<()> {
        self.switch_user(2)?;
        self.adapter.apply_policy_key("");

        let folders = self.folder_sync()?;
        self.site.assert_eq(200, folders.http_status, "FolderSync HTTP status without a policy key")?;
        self.site.assert_eq(Status::SUCCESS, folders.status, "FolderSync status without a policy key")?;

        if self.properties.is_requirement_enabled(509)? {
            self.site.capture(
                509,
                "[In Appendix A: Product Behavior] The implementation does require that the client device has requested and acknowledged the security policy settings before the client is allowed to synchronize with the server, unless a security policy is set on the implementation to allow it.",
            );
        }
        Ok(())
    }

    pub fn policy_status_3(&mut self) -> Result<()> {
        let response = self.call_provision(None, UNKNOWN_POLICY_TYPE)?;
        let policy = self.site.require(response.policy, "Provision response has no Policy")?;

        for (id, description) in [
            (380, "[In Status (Policy)] Value 3 means Unknown PolicyType value."),
            (471, "[In Provision Command Errors] [The cause of status value 3 is] The client sent a policy that the server does not recognize."),
            (502, "[In Provision Command Errors] [When the scope is Policy], [the cause of status value 3 is] The client sent a policy that the server does not recognize."),
        ] {
            self.site.capture_if_eq(Status::UNKNOWN_POLICY_TYPE, policy.status, id, description)?;
        }
        Ok(())
    }

    /// Acknowledge a key that is out of date, then one that was never issued
    pub fn policy_status_5(&mut self) -> Result<()> {
        let response = self.call_provision(None, PROVISIONING_POLICY_TYPE)?;
        let temporary_key = self.site.require(
            response.policy.and_then(|p| p.policy_key),
            "initial Provision response has no PolicyKey",
        )?;
        self.call_provision(Some(&temporary_key), PROVISIONING_POLICY_TYPE)?;

        self.switch_user(1)?;
        let response = self.call_provision(Some(&temporary_key), PROVISIONING_POLICY_TYPE)?;
        self.site.capture_if_eq(
            Some(Status::WRONG_POLICY_KEY),
            response.policy.map(|p| p.status),
            475,
            "[In Provision Command Errors] [The cause of status value 5 is] The client is trying to acknowledge an out-of-date [or invalid policy].",
        )?;

        let response = self.call_provision(Some("1234567890"), PROVISIONING_POLICY_TYPE)?;
        let status = response.policy.map(|p| p.status);
        for (id, description) in [
            (761, "[In Provision Command Errors] [The cause of status value 5 is] The client is trying to acknowledge an [out-of-date or] invalid policy."),
            (382, "[In Status (Policy)] Value 5 means The client is acknowledging the wrong policy key."),
            (692, "[In Provision Command Errors] [The meaning of status value] 5 [is] Policy key mismatch."),
            (507, "[In Provision Command Errors] [When the scope is Policy], [the cause of status value 5 is] The client is trying to acknowledge an out-of-date or invalid policy."),
            (708, "[In Provision Command Errors] [When the scope is] Policy, [the meaning of status value] 5 [is] Policy key mismatch."),
        ] {
            self.site.capture_if_eq(Some(Status::WRONG_POLICY_KEY), status, id, description)?;
        }

        if self.properties.is_requirement_enabled(695)? {
            self.site.capture_if_eq(
                Some(Status::WRONG_POLICY_KEY),
                status,
                695,
                "[In Appendix B: Product Behavior] If the current policy key sent by the client does not match the temporary policy key issued by the server, the implementation does return a Status value of 5.",
            )?;
        }
        Ok(())
    }

    /// A Provision request without a Policy is a protocol error
    pub fn provision_status_2(&mut self) -> Result<()> {
        let mut request = ProvisionRequest::download(PROVISIONING_POLICY_TYPE);
        if self.sends_device_information() {
            request = request.device_information(DEVICE_MODEL);
        }
        request.policy = None;

        let response = self.adapter.provision(&request)?;
        for (id, description) in [
            (395, "[In Status (Provision)] Value 2 means Protocol error."),
            (679, "[In Provision Command Errors] [The meaning of status value] 2 [is] Protocol error."),
            (450, "[In Provision Command Errors] [The cause of status value 2 is] Syntax error in the Provision command request."),
            (497, "[In Provision Command Errors] [When the scope is Global], [the cause of status value 2 is] Syntax error in the Provision command request."),
        ] {
            self.site.capture_if_eq(Status::PROTOCOL_ERROR, response.status, id, description)?;
        }

        if self.properties.is_requirement_enabled(697)? {
            self.site.capture(
                697,
                "[In Appendix B: Product Behavior] If the level of compliance does not meet the server's requirements, the implementation does return an appropriate value in the Status element.",
            );
        }
        Ok(())
    }

    /// A truncated final key is rejected on the next command
    pub fn invalid_policy_key(&mut self) -> Result<()> {
        self.change_device_type(SECONDARY_DEVICE_TYPE);
        let final_key = self.acknowledge()?;
        let invalid: String = final_key.chars().take(1).collect();
        self.adapter.apply_policy_key(&invalid);

        let folders = self.folder_sync()?;
        if self.protocol_version == "12.1" {
            self.site.capture_if_eq(
                449,
                folders.http_status,
                511,
                "[In Appendix A: Product Behavior] When the MS-ASProtocolVersion header is set to 12.1, the server sends an HTTP 449 response to request a Provision command from the client.",
            )?;
            self.site.capture_if_eq(
                449,
                folders.http_status,
                514,
                "[In Appendix A: Product Behavior] When the MS-ASProtocolVersion header is set to 12.1, the server sends an HTTP 449 response to indicate that the client needs to request the security policy settings and obtain a new policy key.",
            )?;
        } else {
            self.site.assert_eq(
                Status::INVALID_POLICY_KEY,
                folders.status,
                "FolderSync with an invalid policy key",
            )?;
        }

        if self.properties.is_requirement_enabled(537)? {
            self.site.capture(
                537,
                "[In Appendix A: Product Behavior] If the policy key sent by the client does not match the stored policy key, the implementation does return a status code in the next command response indicating that the client needs to send another Provision command.",
            );
        }
        Ok(())
    }

    fn sends_device_information(&self) -> bool {
        DEVICE_INFORMATION_VERSIONS.contains(&self.protocol_version.as_str())
    }

    fn current(&self) -> &UserInformation {
        &self.users[self.current_user]
    }

    fn switch_user(&mut self, index: usize) -> Result<()> {
        self.current_user = index;
        self.adapter.switch_user(self.current())?;
        Ok(())
    }

    fn folder_sync(&self) -> Result<FolderSyncResponse> {
        Ok(self.adapter.folder_sync(&FolderSyncRequest::initial())?)
    }

    /// Initial request when `policy_key` is `None`, acknowledgement otherwise
    fn call_provision(&self, policy_key: Option<&str>, policy_type: &str) -> Result<ProvisionResponse> {
        let request = match policy_key {
            Some(key) => ProvisionRequest::acknowledge(policy_type, key, "1"),
            None if self.sends_device_information() => {
                ProvisionRequest::download(policy_type).device_information(DEVICE_MODEL)
            }
            None => ProvisionRequest::download(policy_type),
        };
        Ok(self.adapter.provision(&request)?)
    }

    /// Provision the current device and apply the final key
    fn acknowledge(&mut self) -> Result<String> {
        let response = self.call_provision(None, PROVISIONING_POLICY_TYPE)?;
        self.site.assert_eq(Status::SUCCESS, response.status, "initial Provision status")?;
        let temporary_key = self.site.require(
            response.policy.and_then(|p| p.policy_key),
            "initial Provision response has no PolicyKey",
        )?;

        let response = self.call_provision(Some(&temporary_key), PROVISIONING_POLICY_TYPE)?;
        self.site.assert_eq(Status::SUCCESS, response.status, "acknowledgement Provision status")?;
        let final_key = self.site.require(
            response.policy.and_then(|p| p.policy_key),
            "acknowledgement response has no PolicyKey",
        )?;
        self.adapter.apply_policy_key(&final_key);
        Ok(final_key)
    }

    fn change_device_type(&mut self, device_type: &str) {
        debug!("Using device type {device_type}");
        self.device_type = device_type.to_string();
        self.adapter.apply_device_type(device_type);
    }
}

impl Suite for ProvisioningSuite<'_> {
    fn site_mut(&mut self) -> &mut Site {
        &mut self.site
    }

    /// Remove a device the case added, then sign back in as user 1
    fn cleanup(&mut self) -> Result<()> {
        if self.device_type != self.default_device_type {
            let user = self.current();
            info!("Removing device {} of {}", self.device_type, user.mail_address());
            let removed = self.sut.remove_device(
                &self.sut_computer_name,
                &user.mail_address(),
                &user.password,
                &self.device_type,
            )?;
            let default_device_type = self.default_device_type.clone();
            self.change_device_type(&default_device_type);
            self.site.assert_true(removed, "the secondary device should be removed")?;
        }

        self.switch_user(0)?;
        self.adapter.apply_policy_key("");
        Ok(())
    }

    fn cases() -> Vec<Case<Self>> {
        vec![
            Case::new(
                "S01_TC01_AcknowledgeSecurityPolicySettings",
                Self::acknowledge_security_policy_settings,
            ),
            Case::new(
                "S01_TC02_WithoutAcknowledgingSecurityPolicySettings",
                Self::without_acknowledging_security_policy_settings,
            ),
            Case::new("S03_TC01_VerifyPolicyStatus3", Self::policy_status_3),
            Case::new("S03_TC02_VerifyPolicyStatus5", Self::policy_status_5),
            Case::new("S03_TC03_VerifyProvisionStatus2", Self::provision_status_2),
            Case::new("S03_TC04_VerifyInvalidPolicyKey", Self::invalid_policy_key),
        ]
    }
}
