//! Built-in measure catalogue used until a project stores its own settings

use crate::measure::Measure;

/// Default tag shared by every work item in a conformance graph
pub const DEFAULT_CONFORMANCE_TAG: &str = "Conformance";

/// Default work-item type of measure children
pub const DEFAULT_WORK_ITEM_TYPE: &str = "Task";

/// Default work-item type of the aggregator
pub const DEFAULT_AGGREGATION_WORK_ITEM_TYPE: &str = "User Story";

const DEVELOP: &str = "Develop";
const RELEASE: &str = "Release";

/// The eleven measures shipped with the extension.
#[must_use]
pub fn default_measures() -> Vec<Measure> {
    vec![
        Measure::new("Product Architecture")
            .with_additional_tags(DEVELOP)
            .with_tool_tip("Define product architecture")
            .with_description("Define product architecture (consider also non-functional requirements like performance and sizing, security, data privacy …)<br>Invite for an architecture check for presenting new features to the system architects."),
        Measure::new("Threat and Risk Analysis")
            .with_additional_tags(DEVELOP)
            .with_description("If decided in architecture check, a Security Threat and Risk Analysis has to be done to specify protection goals and impacts, to identify and analyze threats from the security point of view.<br>For more information, see Work Instruction \"Threat and Risk Analysis\".<br><br>Note: A fully or partly executed Threat and Risk Analysis typically will not be done in every release. Basically it has to be done once for every product, if the pre-classification results in medium, high or very high risk.<br>Afterwards, a Threat and Risk Analysis may have to be repeated partly or completely, if there are major architectural changes or new external interfaces.<br>The decision, whether and to what extent a Threat and Risk Analysis has to be done for the current release, is made during architecture check."),
        Measure::new("Data Privacy")
            .with_additional_tags(DEVELOP)
            .with_tool_tip("Check Data privacy issues")
            .with_description("The following checks have to be done:<br>- Does the Application collect log-files/tracking data related to system events, user log-ins or further user interactions?<br>- Is a deletion policy for the log-files/tracking data in place?<br>- Which (further) personal data are processed within the application in addition to log-files/tracking data?<br>- Is the customer given the choice to configure the data collection within the application by itself?<br>- Does the application implement functions that ensure that personal data processed via the Application are accurate, complete and kept up-to-date during their entire information life cycle?<br>- Is a deletion policy for the personal data processed within or by the application in place?<br>- Please use the Data Privacy toolkit . Fill out the form, create a pdf and store it in the project folder.<br>- If necessary, define measures to mitigate identified deficiencies. Support can be given by the responsible Data Privacy Manager."),
        Measure::new("Patent Infringement")
            .with_additional_tags(DEVELOP)
            .with_description("- Clarify whether to apply for patents for newly developed technologies<br>- Clarify whether third party patents / intellectual property rights are affected"),
        Measure::new("PSS Classification")
            .with_additional_tags(DEVELOP)
            .with_description("Identify the security classification of the product developed in this project.<br>Note: The general purpose is to identify security threat scenarios in terms of security weaknesses in the systems or products that might be exploited in attacks. Analyze the resulting security risks to understand which security threats are most significant and need to be addressed.<br>The final decision, whether and to what extent a Threat and Risk Analysis has to be done for the current release, is made during architecture check.<br><br>See Work Instruction \"Threat and Risk Analysis\" for more information.<br><br>In case of developing cloud-based or other infrastructure based systems, it must be determined additionally whether the systems have to undergo an Asset Classification and Protection (ACP) process to identify critical assets."),
        Measure::new("Third Party Clearing")
            .with_additional_tags(RELEASE)
            .with_description("Do the clearing of third-party components for Open Source Software (OSS) and Commcercial Off-The-Shelf (COTS)."),
        Measure::new("Export Control (ECC)")
            .with_additional_tags(RELEASE)
            .with_description("Identify components for  \"de minimis calculation\"<br>Write input for \"de minimis calculation\" together with experts (License Manager). Input is a simple list containing name of the third party component / company name / license fee / export procedure indicator (ECC number).<br>Send calculation to export control group<br><br>Note: A \"de minimis calculation\" is a list of all third-party components used in the product. It is necessary to determine the percentage (based on cost) of U.S. software. Dependent on the result it is decided whether a product can be delivered (exported) to any country or if there are limitations."),
        Measure::new("User Documentation")
            .with_additional_tags(RELEASE)
            .with_description("- Complete all manuals and online helps in source language<br>- Perform review of documents by Experts, Product Lifecycle Manager and Project Manager<br>- Perform proofreading by language professional<br>- Technical editor updates manuals and help files according to review comments<br>- Initiate the translation of manuals and help files (optional; only if translation is required)"),
        Measure::new("Customer Care Training")
            .with_additional_tags(RELEASE)
            .with_description("Train customer care for new features"),
        Measure::new("Cloud Costs")
            .with_additional_tags(RELEASE)
            .with_description("For every new feature the impact on the cloud costs has to be considered."),
        Measure::new("Usability Check")
            .with_additional_tags(RELEASE)
            .with_description(""),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::is_valid_measure_name;
    use std::collections::HashSet;

    #[test]
    fn eleven_unique_valid_measures() {
        let measures = default_measures();
        assert_eq!(measures.len(), 11);

        let names: HashSet<&str> = measures.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names.len(), 11);
        assert!(measures.iter().all(|m| is_valid_measure_name(&m.name)));
    }

    #[test]
    fn every_default_carries_a_phase_tag() {
        for m in default_measures() {
            let tags: Vec<&str> = m.additional_tag_list().collect();
            assert!(tags == [DEVELOP] || tags == [RELEASE], "{}: {tags:?}", m.name);
        }
    }
}
