pub(super) fn init_metrics() {
    describe_upload();
    describe_stage();
    describe_process();
    describe_repo();
    describe_object_storage();
    describe_thumbnail();
}

fn describe_upload() {
    metrics::describe_counter!(
        UPLOAD_START,
        "How many video uploads have entered the ingestion pipeline"
    );
    metrics::describe_counter!(
        UPLOAD_END,
        "How many video uploads have left the ingestion pipeline, labeled by outcome"
    );
    metrics::describe_histogram!(
        UPLOAD_DURATION,
        "Timings for a video upload from staging through the metadata update"
    );
}

pub(crate) const UPLOAD_START: &str = "tubely.upload.start";
pub(crate) const UPLOAD_END: &str = "tubely.upload.end";
pub(crate) const UPLOAD_DURATION: &str = "tubely.upload.duration";

fn describe_stage() {
    metrics::describe_histogram!(
        STAGE_BYTES,
        "Sizes of uploads written to the staging directory"
    );
}

pub(crate) const STAGE_BYTES: &str = "tubely.stage.bytes";

fn describe_process() {
    metrics::describe_counter!(
        PROCESS_START,
        "How many times tubely has spawned an external media tool"
    );
    metrics::describe_histogram!(
        PROCESS_DURATION,
        "Timings for how long external media tools take to complete"
    );
    metrics::describe_counter!(PROCESS_END, "How many external media tools have exited");
}

pub(crate) const PROCESS_START: &str = "tubely.process.start";
pub(crate) const PROCESS_DURATION: &str = "tubely.process.duration";
pub(crate) const PROCESS_END: &str = "tubely.process.end";

fn describe_repo() {
    metrics::describe_histogram!(
        SLED_OPERATION,
        "Timings for operations against the sled metadata store"
    );
}

pub(crate) const SLED_OPERATION: &str = "tubely.sled.operation";

fn describe_object_storage() {
    metrics::describe_histogram!(
        OBJECT_STORAGE_HEAD_BUCKET_REQUEST,
        "Timings for HEAD requests for the tubely bucket in object storage"
    );
    metrics::describe_histogram!(
        OBJECT_STORAGE_PUT_OBJECT_REQUEST,
        "Timings for multipart uploads of normalized videos to object storage"
    );
    metrics::describe_histogram!(
        OBJECT_STORAGE_SIGN_REQUEST,
        "Timings for producing signed playback URLs"
    );
    metrics::describe_histogram!(
        OBJECT_STORAGE_DELETE_OBJECT_REQUEST,
        "Timings for requesting videos in object storage be deleted"
    );
}

pub(crate) const OBJECT_STORAGE_HEAD_BUCKET_REQUEST: &str =
    "tubely.object-storage.head-bucket-request";
pub(crate) const OBJECT_STORAGE_PUT_OBJECT_REQUEST: &str =
    "tubely.object-storage.put-object-request";
pub(crate) const OBJECT_STORAGE_SIGN_REQUEST: &str = "tubely.object-storage.sign-request";
pub(crate) const OBJECT_STORAGE_DELETE_OBJECT_REQUEST: &str =
    "tubely.object-storage.delete-object-request";

fn describe_thumbnail() {
    metrics::describe_counter!(
        THUMBNAIL_STORED,
        "How many thumbnails have been accepted into the in-memory thumbnail store"
    );
}

pub(crate) const THUMBNAIL_STORED: &str = "tubely.thumbnail.stored";
