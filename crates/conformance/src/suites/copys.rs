//! MS-COPYS: copying files between and within SharePoint servers
//!
//! `S01` cases read the source file from the source server and copy it to
//! the destination server with CopyIntoItems. `S02` cases copy within the
//! destination server with CopyIntoItemsLocal. Every destination file is
//! collected and the whole set is deleted with a single call when the
//! suite is torn down.

use log::{debug, info};
use std::collections::HashSet;

use super::{Case, Suite};
use crate::capture::Site;
use crate::context::CreatedUrls;
use crate::error::Result;
use crate::properties::TestProperties;
use crate::sharepoint::urls::{destination_from_pattern, invalid_folder_url, malformed_file_url, validate_file_url};
use crate::sharepoint::{
    CopyErrorCode, CopyIntoItemsResponse, CopysAdapter, CopysSutControl, GetItemResponse,
    ServiceLocation, soap_fault,
};

pub const PROTOCOL: &str = "MS-COPYS";

/// Account that checks out destination files
struct CheckOutUser {
    name: String,
    password: String,
    domain: String,
}

pub struct CopysSuite<'a> {
    adapter: &'a dyn CopysAdapter,
    sut: &'a dyn CopysSutControl,
    properties: TestProperties,
    site: Site,
    source_on_source_sut: String,
    source_on_destination_sut: String,
    destination_pattern: String,
    mws_destination_pattern: String,
    source_contents: String,
    check_out_user: CheckOutUser,
    /// File still checked out by the running case
    checked_out: Option<String>,
    collected: CreatedUrls,
}

impl<'a> CopysSuite<'a> {
    pub fn setup(
        adapter: &'a dyn CopysAdapter,
        sut: &'a dyn CopysSutControl,
        properties: TestProperties,
    ) -> Result<Self> {
        let source_on_source_sut = properties.get("SourceFileUrlOnSourceSUT")?;
        let source_on_destination_sut = properties.get("SourceFileUrlOnDesSUT")?;
        validate_file_url(&source_on_source_sut)?;
        validate_file_url(&source_on_destination_sut)?;

        Ok(Self {
            adapter,
            sut,
            site: Site::new(PROTOCOL),
            source_on_source_sut,
            source_on_destination_sut,
            destination_pattern: properties.get("UrlPatternOfDesFileOnDestinationSUT")?,
            mws_destination_pattern: properties.get("UrlPatternOfDesFileForMWSOnDestinationSUT")?,
            source_contents: properties.get("SourceFileContents")?,
            check_out_user: CheckOutUser {
                name: properties.get("MSCOPYSCheckOutUserName")?,
                password: properties.get("PasswordOfCheckOutUser")?,
                domain: properties.get("Domain")?,
            },
            checked_out: None,
            collected: CreatedUrls::new(),
            properties,
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Delete every collected destination file in one call
    pub fn teardown(mut self) -> Result<Site> {
        self.cleanup()?;
        let files = self.collected.take();
        if !files.is_empty() {
            info!("Deleting {} collected file(s)", files.len());
            let deleted = self.sut.delete_files(&files)?;
            self.site.assert_true(deleted, "Not all the collected files were deleted")?;
        }
        Ok(self.site)
    }

    pub fn get_item_success(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let item = self.adapter.get_item(&self.source_on_source_sut)?;
        let contents = item.stream_text()?;

        for (id, description) in [
            (165, "[In Message Processing Events and Sequencing Rules] GetItem: Retrieves a file and metadata for that file from the source location."),
            (167, "[In GetItem] The GetItem operation retrieves content and metadata for a file that is stored in a source location."),
            (178, "[In GetItem] [The protocol server returns results based on the following conditions:] If the source location points to an existing file in the source location and the file can be read based on the permission settings for the file, the source location MUST return the content and metadata of the file."),
        ] {
            self.site.capture_if_eq(Some(self.source_contents.as_str()), contents.as_deref(), id, description)?;
        }

        if item.fields.as_ref().is_some_and(|fields| !fields.is_empty()) {
            self.site.capture_if_some(
                &item.stream,
                197,
                "[In GetItemResponse] [Fields] If the Fields element is present, the Stream element MUST be present as well.",
            )?;
        }
        Ok(())
    }

    pub fn get_item_fail(&mut self) -> Result<()> {
        self.site.assume(
            self.properties.is_requirement_enabled(1048)?,
            "runs only when R1048Enabled is true",
        )?;
        self.use_source_sut()?;

        let invalid_url = self.site.resource_name("URL");
        let faulted = match self.adapter.get_item(&invalid_url) {
            Ok(_) => false,
            Err(e) => match soap_fault(&e) {
                Some(fault) => {
                    debug!("GetItem of {invalid_url} faulted: {}", fault.message);
                    true
                }
                None => return Err(e.into()),
            },
        };
        self.site.capture_if_true(
            faulted,
            1048,
            "[In Appendix B: Product Behavior] Implementation does return a SOAP fault if the URL parameter is an invalid URI format string.",
        )
    }

    pub fn get_item_internal_name_unique(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let item = self.adapter.get_item(&self.source_on_source_sut)?;
        let fields = self.site.require(item.fields, "GetItem returned no Fields")?;

        let names: HashSet<&str> = fields.iter().map(|f| f.internal_name.as_str()).collect();
        self.site.capture_if_eq(
            fields.len(),
            names.len(),
            73,
            "[In FieldInformationCollection] The InternalName attribute values MUST be unique for a sample of N (default N=10) across all FieldInformation elements in the collection.",
        )
    }

    pub fn get_item_id_unique(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let item = self.adapter.get_item(&self.source_on_source_sut)?;
        let fields = self.site.require(item.fields, "GetItem returned no Fields")?;

        let ids: HashSet<_> = fields.iter().map(|f| f.id).collect();
        self.site.capture_if_eq(
            fields.len(),
            ids.len(),
            75,
            "[In FieldInformationCollection] The Id attribute values MUST be unique for a sample of N (default N=10) across FieldInformation elements in the collection.",
        )
    }

    pub fn copy_into_items_success(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_from_source(&destinations)?;

        self.site.assert_eq(2, response.results.len(), "Results should contain two CopyResult elements")?;
        for result in &response.results {
            self.site.assert_eq(CopyErrorCode::Success, result.error_code, "CopyIntoItems should succeed")?;
        }
        self.site.capture(
            207,
            "[In CopyIntoItems] The protocol server MUST report the status of the operation inside the Results collection (see section 3.1.4.2.2.2) for each destination location that is passed.",
        );
        self.site.capture(
            87,
            "[In CopyErrorCode] Success: This value is used when the CopyIntoItems operation succeeds for the specified destination location.",
        );
        self.site.capture_if_true(
            response.results[0].error_message.as_deref().is_none_or(str::is_empty),
            50,
            "[In CopyResult] [ErrorMessage] [For CopyIntoItems operation] If the value of ErrorCode is \"Success,\" the attribute MUST NOT be present.",
        )
    }

    pub fn copy_into_items_destination_checked_out(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destination = self.destination_url()?;
        self.upload_text_file(&destination)?;

        let item = self.adapter.get_item(&self.source_on_source_sut)?;
        self.adapter.switch_target(ServiceLocation::DestinationSut)?;
        self.check_out(&destination)?;
        let response = self.copy_item(&item, &self.source_on_source_sut, std::slice::from_ref(&destination))?;
        self.undo_check_out()?;

        self.site.assert_eq(1, response.results.len(), "Results should contain one CopyResult element")?;
        let result = &response.results[0];
        self.site.assert_eq(
            CopyErrorCode::DestinationCheckedOut,
            result.error_code,
            "CopyIntoItems to a checked out file should fail with DestinationCheckedOut",
        )?;
        self.site.capture(
            102,
            "[In CopyErrorCode] [For CopyIntoItems operation] DestinationCheckedOut This value is used to indicate an error when the file on the destination location is checked out and cannot be overridden.",
        );

        let has_message = result.error_message.as_deref().is_some_and(|m| !m.is_empty());
        self.site.capture_if_true(
            has_message,
            219,
            "[In CopyIntoItems] If the file on the protocol server is checked out and cannot be updated, the protocol server MUST report a failure of the copy operation by setting the value of the ErrorCode attribute of the corresponding CopyResult element to \"DestinationCheckedOut\", and provide a string value that specifies the error in the ErrorMessage attribute.",
        )?;
        self.site.capture_if_true(
            has_message,
            154,
            "[In Abstract Data Model] In this case[files as checked out], the CopyIntoItems operations take into account the checked-out status when accessing files at the destination locations.",
        )
    }

    pub fn copy_into_items_destination_mws(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destination = self.mws_destination_url()?;
        let response = self.copy_from_source(std::slice::from_ref(&destination))?;

        self.site.assert_eq(1, response.results.len(), "Results should contain one CopyResult element")?;
        let result = &response.results[0];
        self.site.assert_eq(
            CopyErrorCode::DestinationMWS,
            result.error_code,
            "CopyIntoItems into a Meeting Workspace should fail with DestinationMWS",
        )?;
        self.site.capture(
            162,
            "[In Abstract Data Model]The protocol server can proceed with CopyIntoItems operation which attempting to use locations that are part of a Meeting Workspace site as a destination.",
        );
        self.site.capture(
            158,
            "[In Abstract Data Model] Although such locations[Some locations on a protocol server can be part of a Meeting Workspace site] are valid file locations, attempts to use such a location as a destination for a CopyIntoItems operation will fail.",
        );
        self.site.capture(
            96,
            "[In CopyErrorCode] [For CopyIntoItems operation] DestinationMWS: This value is used to indicate a failure to copy the file because the destination location is inside a Meeting Workspace site.",
        );
        self.site.capture_if_false(
            result.error_message.as_deref().is_none_or(str::is_empty),
            220,
            "[In CopyIntoItems] If the destination location is part of a Meeting Workspace site, the protocol server MUST report a failure of the copy operation by setting the value of the ErrorCode attribute of the corresponding CopyResult element to \"DestinationMWS\", and provide a string value that specifies the error in the ErrorMessage attribute.",
        )
    }

    pub fn copy_into_items_malformed_iri(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destination = malformed_file_url(&self.destination_url()?)?;
        let item = self.adapter.get_item(&self.source_on_source_sut)?;
        self.adapter.switch_target(ServiceLocation::DestinationSut)?;
        let response = self.copy_item(&item, &self.source_on_source_sut, std::slice::from_ref(&destination))?;

        self.site.assert_eq(1, response.results.len(), "Results should contain one CopyResult element")?;
        self.site.capture_if_eq(
            CopyErrorCode::InvalidUrl,
            response.results[0].error_code,
            104,
            "[In CopyErrorCode] InvalidUrl: This value is used to indicate an error when the IRI of a destination location is malformed.",
        )
    }

    pub fn get_item_file_not_exist(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let missing = malformed_file_url(&self.source_on_source_sut)?;
        let item = self.adapter.get_item(&missing)?;

        self.site.assert_true(
            item.stream.as_deref().is_none_or(str::is_empty),
            "Stream must be absent when the source file does not exist",
        )?;
        self.site.assert_true(item.fields.is_none(), "Fields must be absent when the source file does not exist")?;
        self.site.capture(
            176,
            "[In GetItem] [The protocol server returns results based on the following conditions:] If the source location does not point to an existing file on the protocol server, the protocol server MUST omit the Fields and Stream elements in the GetItemResponse element (section 3.1.4.1.2.2).",
        );
        Ok(())
    }

    pub fn copy_into_items_check_file_content(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_from_source(&destinations)?;
        self.assert_all_succeeded(&response, destinations.len())?;

        for result in &response.results {
            let copied = self.adapter.get_item(&result.destination_url)?;
            self.assert_contents(&copied)?;
        }

        for (id, description) in [
            (200, "[In CopyIntoItems] The CopyIntoItems operation copies a file to the destination server."),
            (166, "[In Message Processing Events and Sequencing Rules] CopyIntoItems: Copies a file to a destination server that is different from the source location."),
            (218, "[In CopyIntoItems] The protocol server MUST attempt to copy the file to all destination locations that are specified in the request."),
            (201, "[In CopyIntoItems] This operation can be used when the destination server is different from the source location."),
        ] {
            self.site.capture(id, description);
        }
        Ok(())
    }

    pub fn copy_into_items_check_result_number(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_from_source(&destinations)?;
        self.assert_all_succeeded(&response, destinations.len())?;

        self.site.capture(
            254,
            "[In CopyIntoItemsResponse] It contains a collection of results for each destination location that was passed to the protocol server in the CopyIntoItems request.",
        );
        self.site.capture(
            260,
            "[In CopyIntoItemsResponse] [Results] The collection MUST have exactly one record for each destination location that is passed into the request, as specified in section 3.1.4.2.",
        );
        Ok(())
    }

    pub fn copy_into_items_check_result_order(&mut self) -> Result<()> {
        self.use_source_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_from_source(&destinations)?;
        self.assert_all_succeeded(&response, destinations.len())?;
        self.assert_result_order(&response, &destinations)?;

        self.site.capture(
            208,
            "[In CopyIntoItems] The CopyResult element in the Results collection MUST be in the same order as the items in the destination locations collection.",
        );
        self.site.capture(
            209,
            "[In CopyIntoItems] The DestinationUrl attribute of the CopyResult element (section 2.2.4.2) that corresponds to the destination location MUST be set to the value of the destination location.",
        );
        Ok(())
    }

    pub fn copy_into_items_local_success(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_local(&destinations)?;

        self.site.assert_eq(2, response.results.len(), "Results should contain two CopyResult elements")?;
        for result in &response.results {
            self.site.assert_eq(CopyErrorCode::Success, result.error_code, "CopyIntoItemsLocal should succeed")?;
        }
        for (id, description) in [
            (281, "[In CopyIntoItemsLocal] The protocol server MUST report the status of the operation inside the Results collection for each destination location that is passed."),
            (88, "[In CopyErrorCode] Success: This value is used when the CopyIntoItemsLocal operation succeeds for the specified destination location."),
            (277, "[In CopyIntoItemsLocal] The protocol server MUST perform the copy operation for the file and construct a response."),
        ] {
            self.site.capture(id, description);
        }
        self.site.capture_if_true(
            response.results[0].error_message.as_deref().is_none_or(str::is_empty),
            51,
            "[In CopyResult] [ErrorMessage] [For CopyIntoItemsLocal operation] If the value of ErrorCode is \"Success,\" the attribute MUST NOT be present.",
        )
    }

    pub fn copy_into_items_local_destination_invalid(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let destination = invalid_folder_url(&self.destination_url()?)?;
        let response = self
            .adapter
            .copy_into_items_local(&self.source_on_destination_sut, std::slice::from_ref(&destination))?;

        self.site.assert_eq(1, response.results.len(), "Results should contain one CopyResult element")?;
        let code = response.results[0].error_code;
        self.site.capture_if_eq(
            CopyErrorCode::DestinationInvalid,
            code,
            92,
            "[In CopyErrorCode] DestinationInvalid: This value is used to indicate the destination location points to a folder location that is not valid on the destination server.",
        )?;
        self.site.capture_if_eq(
            CopyErrorCode::DestinationInvalid,
            code,
            279,
            "[In CopyIntoItemsLocal] [If the source location and the destination location refer to different protocol servers, or ]if the destination location points to a non-existing folder, the protocol server MUST report a failure by returning the CopyResult element with the ErrorCode attribute set to \"DestinationInvalid\".",
        )
    }

    pub fn copy_into_items_local_destination_mws(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let destinations = vec![self.destination_url()?, self.mws_destination_url()?];
        let response = self.copy_local(&destinations)?;

        self.site.assert_eq(2, response.results.len(), "Results should contain two CopyResult elements")?;
        self.site.assert_eq(
            CopyErrorCode::Success,
            response.results[0].error_code,
            "CopyIntoItemsLocal to the document library should succeed",
        )?;
        self.site.assert_eq(
            CopyErrorCode::DestinationMWS,
            response.results[1].error_code,
            "CopyIntoItemsLocal into a Meeting Workspace should fail with DestinationMWS",
        )?;
        for (id, description) in [
            (163, "[In Abstract Data Model]The protocol server can proceed with CopyIntoItemsLocal operation which attempting to use locations that are part of a Meeting Workspace site as a destination."),
            (159, "[In Abstract Data Model] Although such locations[Some locations on a protocol server can be part of a Meeting Workspace site] are valid file locations, attempts to use such a location as a destination for a CopyIntoItemsLocal operation will fail."),
            (97, "[In CopyErrorCode] [For CopyIntoItemsLocal operation] DestinationMWS: This value is used to indicate a failure to copy the file because the destination location is inside a Meeting Workspace site."),
        ] {
            self.site.capture(id, description);
        }

        let missing_message = response.results[1].error_message.as_deref().is_none_or(str::is_empty);
        self.site.capture_if_false(
            missing_message,
            54,
            "[In CopyResult] [ErrorMessage] [For CopyIntoItemsLocal operation] Otherwise[If the value of ErrorCode is not \"Success\" ], the ErrorMessage attribute MUST be present and the value MUST be a non-empty Unicode string.",
        )?;
        self.site.capture_if_false(
            missing_message,
            287,
            "[In CopyIntoItemsLocal] If the destination location is part of a Meeting Workspace site, the protocol server MUST report a failure of the copy operation by setting the value of the ErrorCode attribute of the corresponding CopyResult element to \"DestinationMWS\", and provide a string value that specifies the error in the ErrorMessage attribute.",
        )
    }

    pub fn copy_into_items_local_destination_checked_out(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let destination = self.destination_url()?;
        self.upload_text_file(&destination)?;
        self.check_out(&destination)?;
        let response = self
            .adapter
            .copy_into_items_local(&self.source_on_destination_sut, std::slice::from_ref(&destination))?;
        self.undo_check_out()?;

        self.site.assert_eq(1, response.results.len(), "Results should contain one CopyResult element")?;
        let code = response.results[0].error_code;
        for (id, description) in [
            (155, "[In Abstract Data Model] In this case[files as checked out], the CopyIntoItemsLocal operations take into account the checked-out status when accessing files at the destination locations."),
            (286, "[In CopyIntoItemsLocal] If the file on the protocol server is checked out and cannot be updated, the protocol server MUST report a failure of the copy operation by setting the value of the ErrorCode attribute of the corresponding CopyResult element to \"DestinationCheckedOut\", and provide a string value that specifies the error in the ErrorMessage attribute."),
            (103, "[In CopyErrorCode] [For CopyIntoItemsLocal operation] DestinationCheckedOut: This value is used to indicate an error when the file on the destination location is checked out and cannot be overridden."),
        ] {
            self.site.capture_if_eq(CopyErrorCode::DestinationCheckedOut, code, id, description)?;
        }
        Ok(())
    }

    /// Source file inside a folder that does not exist
    pub fn copy_into_items_local_source_not_exist(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let source = invalid_folder_url(&self.source_on_destination_sut)?;
        let destination = self.destination_url()?;
        let response = self
            .adapter
            .copy_into_items_local(&source, std::slice::from_ref(&destination))?;
        self.collect(std::slice::from_ref(&destination));

        self.site.assert_eq(1, response.results.len(), "Results should contain one CopyResult element")?;
        let code = response.results[0].error_code;
        for (id, description) in [
            (111, "[In CopyErrorCode] [For CopyIntoItemsLocal operation] Unknown: This value is used to indicate an error for all other error conditions for a given destination location."),
            (271, "[In CopyIntoItemsLocal] If the source location does not point to an existing file, then if the destination location does not point to a existing folder or file, the protocol server MUST report a failure by returning the CopyResult element (section 2.2.4.2) with the ErrorCode attribute set to \"Unknown\" for this destination location."),
            (289, "[In CopyIntoItemsLocal] If the file cannot be created at the given destination location, the protocol server MUST report a failure for this destination location by setting the ErrorCode attribute of the corresponding CopyResult element to \"Unknown\" and provide a string value that describes the error in the ErrorMessage attribute."),
        ] {
            self.site.capture_if_eq(CopyErrorCode::Unknown, code, id, description)?;
        }
        Ok(())
    }

    pub fn copy_into_items_local_check_file_content(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_local(&destinations)?;
        self.assert_all_succeeded(&response, destinations.len())?;

        for result in &response.results {
            let copied = self.adapter.get_item(&result.destination_url)?;
            self.assert_contents(&copied)?;
        }
        for (id, description) in [
            (168, "[In Message Processing Events and Sequencing Rules] CopyIntoItemsLocal: Copies a file when the destination of the file is on the same protocol server as the source location."),
            (285, "[In CopyIntoItemsLocal] The protocol server MUST attempt to copy the file to all destination locations that are specified in the request."),
            (265, "[In CopyIntoItemsLocal] The source location and the destination server refer to the same protocol server for this operation."),
            (261, "[In CopyIntoItemsLocal] The CopyIntoItemsLocal operation copies a file, and the associated metadata, from one location to one or more locations on the same protocol server."),
        ] {
            self.site.capture(id, description);
        }
        Ok(())
    }

    pub fn copy_into_items_local_check_result_number(&mut self) -> Result<()> {
        self.use_destination_sut()?;
        let destinations = vec![self.destination_url()?, self.destination_url()?];
        let response = self.copy_local(&destinations)?;
        self.assert_all_succeeded(&response, destinations.len())?;
        self.assert_result_order(&response, &destinations)?;

        self.site.capture(
            311,
            "[In CopyIntoItemsLocalResponse] [Results] The collection MUST have exactly one entry for each destination location that is passed into the request.",
        );
        Ok(())
    }

    /// CopyIntoItems cases need a configured source server
    fn use_source_sut(&mut self) -> Result<()> {
        let source_server = self.properties.get_opt("SourceSutComputerName")?;
        self.site.assume(
            source_server.is_some_and(|name| !name.is_empty()),
            "runs only when SourceSutComputerName is set",
        )?;
        Ok(self.adapter.switch_target(ServiceLocation::SourceSut)?)
    }

    fn use_destination_sut(&mut self) -> Result<()> {
        Ok(self.adapter.switch_target(ServiceLocation::DestinationSut)?)
    }

    /// Unique `.txt` file in the destination document library
    fn destination_url(&mut self) -> Result<String> {
        let file_name = format!("{}.txt", self.site.resource_name("file"));
        Ok(destination_from_pattern(&self.destination_pattern, &file_name)?)
    }

    fn mws_destination_url(&mut self) -> Result<String> {
        let file_name = format!("{}.txt", self.site.resource_name("file"));
        Ok(destination_from_pattern(&self.mws_destination_pattern, &file_name)?)
    }

    fn collect(&mut self, urls: &[String]) {
        for url in urls {
            self.collected.record(url.clone());
        }
    }

    fn upload_text_file(&mut self, url: &str) -> Result<()> {
        let uploaded = self.sut.upload_text_file(url)?;
        self.site.assert_true(uploaded, &format!("Could not upload a text file to {url}"))?;
        self.collected.record(url);
        Ok(())
    }

    fn check_out(&mut self, url: &str) -> Result<()> {
        let user = &self.check_out_user;
        let checked_out = self.sut.check_out_file(url, &user.name, &user.password, &user.domain)?;
        self.site.assert_true(checked_out, &format!("Check out of {url} by {} failed", user.name))?;
        self.checked_out = Some(url.to_string());
        Ok(())
    }

    fn undo_check_out(&mut self) -> Result<()> {
        let Some(url) = self.checked_out.take() else {
            return Ok(());
        };
        let user = &self.check_out_user;
        let undone = self
            .sut
            .undo_check_out_file(&url, &user.name, &user.password, &user.domain)?;
        self.site.assert_true(undone, &format!("Undo check out of {url} failed"))
    }

    fn copy_item(
        &self,
        item: &GetItemResponse,
        source_url: &str,
        destinations: &[String],
    ) -> Result<CopyIntoItemsResponse> {
        let stream = self.site.require(item.stream.as_deref(), "source file has no Stream")?;
        let fields = item.fields.as_deref().unwrap_or_default();
        Ok(self.adapter.copy_into_items(source_url, destinations, fields, stream)?)
    }

    /// GetItem on the source server, then CopyIntoItems on the destination
    fn copy_from_source(&mut self, destinations: &[String]) -> Result<CopyIntoItemsResponse> {
        let item = self.adapter.get_item(&self.source_on_source_sut)?;
        self.adapter.switch_target(ServiceLocation::DestinationSut)?;
        let response = self.copy_item(&item, &self.source_on_source_sut, destinations)?;
        self.collect(destinations);
        Ok(response)
    }

    fn copy_local(&mut self, destinations: &[String]) -> Result<CopyIntoItemsResponse> {
        let response = self
            .adapter
            .copy_into_items_local(&self.source_on_destination_sut, destinations)?;
        self.collect(destinations);
        Ok(response)
    }

    fn assert_all_succeeded(&self, response: &CopyIntoItemsResponse, count: usize) -> Result<()> {
        self.site.assert_true(response.all_succeeded(), "every copy should succeed")?;
        self.site.assert_eq(count, response.results.len(), "one CopyResult per destination")
    }

    fn assert_result_order(&self, response: &CopyIntoItemsResponse, destinations: &[String]) -> Result<()> {
        for (result, destination) in response.results.iter().zip(destinations) {
            self.site.assert_eq(
                destination.as_str(),
                result.destination_url.as_str(),
                "DestinationUrl should follow the request order",
            )?;
        }
        Ok(())
    }

    fn assert_contents(&self, item: &GetItemResponse) -> Result<()> {
        let contents = item.stream_text()?;
        self.site.assert_eq(
            Some(self.source_contents.as_str()),
            contents.as_deref(),
            "copied file should have the source contents",
        )
    }
}

impl Suite for CopysSuite<'_> {
    fn site_mut(&mut self) -> &mut Site {
        &mut self.site
    }

    /// Release a file the case left checked out
    fn cleanup(&mut self) -> Result<()> {
        self.undo_check_out()
    }

    fn cases() -> Vec<Case<Self>> {
        vec![
            Case::new("S01_TC01_GetItem_Success", Self::get_item_success),
            Case::new("S01_TC02_GetItem_Fail", Self::get_item_fail),
            Case::new("S01_TC04_GetItem_InternalNameUnique", Self::get_item_internal_name_unique),
            Case::new("S01_TC05_GetItem_IdUnique", Self::get_item_id_unique),
            Case::new("S01_TC06_CopyIntoItems_ErrorCodeForSuccess", Self::copy_into_items_success),
            Case::new(
                "S01_TC08_CopyIntoItems_DestinationCheckedOut",
                Self::copy_into_items_destination_checked_out,
            ),
            Case::new("S01_TC09_CopyIntoItems_DestinationMWS", Self::copy_into_items_destination_mws),
            Case::new("S01_TC10_CopyIntoItems_MalformedIRI", Self::copy_into_items_malformed_iri),
            Case::new("S01_TC17_GetItem_FileNotExist", Self::get_item_file_not_exist),
            Case::new("S01_TC18_CopyIntoItems_CheckFileContent", Self::copy_into_items_check_file_content),
            Case::new("S01_TC19_CopyIntoItems_CheckResultNumber", Self::copy_into_items_check_result_number),
            Case::new("S01_TC20_CopyIntoItems_CheckResultOrder", Self::copy_into_items_check_result_order),
            Case::new("S02_TC01_CopyIntoItemsLocal_ErrorCodeForSuccess", Self::copy_into_items_local_success),
            Case::new(
                "S02_TC02_CopyIntoItemsLocal_DestinationInvalid",
                Self::copy_into_items_local_destination_invalid,
            ),
            Case::new(
                "S02_TC03_CopyIntoItemsLocal_DestinationMWS",
                Self::copy_into_items_local_destination_mws,
            ),
            Case::new(
                "S02_TC04_CopyIntoItemsLocal_DestinationCheckedOut",
                Self::copy_into_items_local_destination_checked_out,
            ),
            Case::new(
                "S02_TC05_CopyIntoItemsLocal_SourceNotPointExistFolder",
                Self::copy_into_items_local_source_not_exist,
            ),
            Case::new(
                "S02_TC09_CopyIntoItemsLocal_CheckFileContent",
                Self::copy_into_items_local_check_file_content,
            ),
            Case::new(
                "S02_TC10_CopyIntoItemsLocal_CheckResultNumber",
                Self::copy_into_items_local_check_result_number,
            ),
        ]
    }
}
